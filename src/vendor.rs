//! Vendor identity and vendor-wide predicates.
//!
//! The active vendor is classified exactly once, into a [`VendorId`], and
//! consulted only at registry selection time and through the predicates
//! here. Extraction logic itself stays vendor-agnostic; per-vendor quirks
//! live in `crate::drivers`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

/// Supported relational engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    Mysql,
    Mssql,
    Oracle,
}

impl Engine {
    /// Get the canonical engine name.
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::Mysql => "mysql",
            Engine::Mssql => "mssql",
            Engine::Oracle => "oracle",
        }
    }

    /// Parse an engine name, accepting common aliases.
    ///
    /// - "postgres", "postgresql", "pg" → Postgres
    /// - "mysql", "mariadb" → Mysql
    /// - "mssql", "sqlserver", "sql_server" → Mssql
    /// - "oracle" → Oracle
    pub fn parse(name: &str) -> Result<Engine> {
        match name.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Engine::Postgres),
            "mysql" | "mariadb" => Ok(Engine::Mysql),
            "mssql" | "sqlserver" | "sql_server" => Ok(Engine::Mssql),
            "oracle" => Ok(Engine::Oracle),
            other => Err(SnapshotError::UnsupportedVendor(other.to_string())),
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which relational engine, which major version.
///
/// The single classification value that drives registry selection and
/// system-object exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorId {
    pub engine: Engine,
    /// Major server version, when the provider knows it.
    pub major_version: Option<u32>,
}

impl VendorId {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            major_version: None,
        }
    }

    pub fn with_version(engine: Engine, major_version: u32) -> Self {
        Self {
            engine,
            major_version: Some(major_version),
        }
    }

    /// Whether unquoted identifier comparisons are case-sensitive.
    ///
    /// All built-in engines fold unquoted identifiers, so name lookups are
    /// case-insensitive. Centralized here so the rule is applied exactly
    /// once, by the snapshot's name matcher.
    pub fn case_sensitive_names(&self) -> bool {
        false
    }

    /// Whether the engine has standalone sequence objects.
    ///
    /// SQL Server gained sequences in 2012 (major version 11).
    pub fn supports_sequences(&self) -> bool {
        match self.engine {
            Engine::Postgres | Engine::Oracle => true,
            Engine::Mysql => false,
            Engine::Mssql => self.major_version.map(|v| v >= 11).unwrap_or(true),
        }
    }

    /// Schemas owned by the engine itself, excluded from snapshots.
    pub fn system_schemas(&self) -> &'static [&'static str] {
        match self.engine {
            Engine::Postgres => &["pg_catalog", "information_schema", "pg_toast"],
            Engine::Mysql => &["mysql", "information_schema", "performance_schema", "sys"],
            Engine::Mssql => &["sys", "information_schema"],
            Engine::Oracle => &[
                "sys", "system", "outln", "xdb", "ctxsys", "mdsys", "dbsnmp",
            ],
        }
    }

    /// Whether a relation is an engine-internal object.
    ///
    /// Covers system schemas plus vendor-specific name patterns (Postgres
    /// TOAST relations, Oracle recycle-bin `BIN$` tables, SQL Server
    /// diagram/tracking helpers).
    pub fn is_system_relation(&self, schema: &str, name: &str) -> bool {
        let schema_lc = schema.to_lowercase();
        if self.system_schemas().contains(&schema_lc.as_str()) {
            return true;
        }
        match self.engine {
            Engine::Postgres => schema_lc.starts_with("pg_toast") || schema_lc.starts_with("pg_temp"),
            Engine::Oracle => name.starts_with("BIN$"),
            Engine::Mssql => name.eq_ignore_ascii_case("sysdiagrams"),
            Engine::Mysql => false,
        }
    }
}

impl std::fmt::Display for VendorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.major_version {
            Some(v) => write!(f, "{} {}", self.engine, v),
            None => write!(f, "{}", self.engine),
        }
    }
}
