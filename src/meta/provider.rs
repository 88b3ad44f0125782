//! The metadata provider boundary.
//!
//! A [`MetadataProvider`] wraps one already-open database connection and
//! exposes the structured metadata queries the snapshot engine consumes,
//! plus the ability to run secondary vendor SQL (enum definitions, sequence
//! catalogs, auto-increment probes). Connection setup, TLS, timeouts and
//! cancellation are the caller's responsibility.
//!
//! Raw rows deliberately mirror what vendors report, quirks included;
//! reconciliation into the canonical model happens in the generators.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::RelationKind;
use crate::vendor::VendorId;

/// Raw relation row from the vendor's catalog.
#[derive(Debug, Clone)]
pub struct RelationRow {
    pub schema: String,
    pub name: String,
    pub kind: RelationKind,
    pub remarks: Option<String>,
    /// Default tablespace, where reported.
    pub tablespace: Option<String>,
}

/// Raw column row.
///
/// `ordinal` is reported 1-based and may contain gaps (dropped columns on
/// some vendors); the column phase repairs them.
#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub table: String,
    pub name: String,
    /// JDBC-style numeric type code, where the vendor reports one.
    pub type_code: Option<i32>,
    /// Vendor type name (e.g. "int4", "NUMBER", "enum").
    pub type_name: String,
    /// Declared size for character/binary types.
    pub size: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    /// "BYTE"/"CHAR" style hint for character size semantics.
    pub size_unit_hint: Option<String>,
    pub nullable: bool,
    /// Raw default text, exactly as the vendor reports it.
    pub default_value: Option<String>,
    pub remarks: Option<String>,
    /// Vendor auto-increment flag, where one exists. `None` means the
    /// vendor gives no signal and detection must fall back to patterns or
    /// probing.
    pub auto_increment: Option<bool>,
    /// Generated/computed column expression, where reported separately.
    pub generation_expression: Option<String>,
    pub ordinal: i32,
}

/// Raw primary key column row (one per key column).
#[derive(Debug, Clone)]
pub struct PrimaryKeyRow {
    pub table: String,
    pub column: String,
    /// 1-based position within the key.
    pub key_seq: i32,
    pub pk_name: Option<String>,
    pub tablespace: Option<String>,
}

/// Raw foreign key column row (one per key column).
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub name: String,
    pub table: String,
    pub column: String,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_column: String,
    /// 1-based position within the key.
    pub key_seq: i32,
    /// Vendor update rule code (JDBC scheme unless
    /// [`MetadataProvider::reports_sp_fkeys_rule_codes`] says otherwise).
    pub update_rule: Option<i32>,
    /// Vendor delete rule code.
    pub delete_rule: Option<i32>,
    pub deferrable: bool,
    pub initially_deferred: bool,
}

/// Raw index column row (one per indexed column).
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub table: String,
    pub index_name: String,
    pub column: String,
    /// 1-based position within the index.
    pub position: i32,
    pub unique: bool,
    /// Partial-index predicate, where supported.
    pub predicate: Option<String>,
}

/// Raw unique constraint column row (one per constrained column).
#[derive(Debug, Clone)]
pub struct UniqueConstraintRow {
    pub table: String,
    pub name: String,
    pub column: String,
    /// 1-based position within the constraint.
    pub position: i32,
    pub deferrable: bool,
    pub initially_deferred: bool,
    pub disabled: bool,
    /// Enforcing index name, where the vendor links them.
    pub backing_index: Option<String>,
}

/// Raw sequence row.
///
/// Values are reported as text; vendors disagree on numeric width (Oracle
/// sequence bounds exceed `i64`). Parsing and default-suppression happen in
/// the vendor's sequence generator.
#[derive(Debug, Clone, Default)]
pub struct SequenceRow {
    pub schema: String,
    pub name: String,
    pub start_value: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub increment_by: Option<String>,
    pub cache_size: Option<String>,
    pub cycle: Option<bool>,
    pub ordered: Option<bool>,
    pub data_type: Option<String>,
}

/// One row of a secondary vendor SQL query, keyed by column name.
///
/// Values are carried as text; helpers parse on demand.
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    values: HashMap<String, Option<String>>,
}

impl SqlRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) -> &mut Self {
        self.values.insert(column.into().to_lowercase(), value);
        self
    }

    /// Get a column's text value. Column names are case-insensitive.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(&column.to_lowercase())
            .and_then(|v| v.as_deref())
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column)?.trim().parse().ok()
    }

    pub fn get_i128(&self, column: &str) -> Option<i128> {
        self.get(column)?.trim().parse().ok()
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        match self.get(column)?.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "y" | "Y" | "YES" | "yes" => Some(true),
            "0" | "f" | "F" | "false" | "FALSE" | "n" | "N" | "NO" | "no" => Some(false),
            _ => None,
        }
    }
}

/// Structured metadata interface over one open connection.
///
/// Every enumerate method is scoped by (catalog, schema, table-or-None);
/// passing `None` for the table requests all rows for the schema in one
/// round trip. Implementations must parameterize queries; inline identifier
/// substitution is permitted only for identifiers already validated as
/// identifiers, where a vendor's catalog views leave no choice.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Classify the connected engine.
    fn vendor(&self) -> VendorId;

    /// Enumerate tables and views.
    async fn relations(
        &self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<RelationRow>>;

    /// Enumerate columns.
    async fn columns(
        &self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ColumnRow>>;

    /// Enumerate primary key columns.
    async fn primary_keys(
        &self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<PrimaryKeyRow>>;

    /// Enumerate foreign key columns.
    async fn foreign_keys(
        &self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRow>>;

    /// Enumerate unique constraint columns.
    async fn unique_constraints(
        &self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<UniqueConstraintRow>>;

    /// Enumerate index columns.
    async fn indexes(
        &self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<IndexRow>>;

    /// Enumerate sequences for a schema.
    ///
    /// Vendors without sequences return an empty list.
    async fn sequences(&self, catalog: Option<&str>, schema: &str) -> Result<Vec<SequenceRow>>;

    /// Fetch a view's defining query text.
    ///
    /// Returns [`crate::error::SnapshotError::Permission`] when the
    /// database withholds the definition; the orchestrator substitutes a
    /// sentinel rather than failing the snapshot.
    async fn view_definition(
        &self,
        catalog: Option<&str>,
        schema: &str,
        view: &str,
    ) -> Result<String>;

    /// Run a secondary vendor SQL query (enum definitions, probes).
    async fn query(&self, sql: &str) -> Result<Vec<SqlRow>>;

    /// Last-resort auto-increment probe for vendors with no metadata
    /// signal: select zero rows and inspect the result descriptor.
    ///
    /// `None` means the provider cannot probe.
    async fn probe_auto_increment(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        _table: &str,
        _column: &str,
    ) -> Result<Option<bool>> {
        Ok(None)
    }

    /// Whether FK rule codes use the legacy sp_fkeys ordinal scheme
    /// (0=cascade, 1=no action, 2=set null, 3=set default) instead of the
    /// standard code scheme. Old SQL Server drivers report this way.
    fn reports_sp_fkeys_rule_codes(&self) -> bool {
        false
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_row_case_insensitive_columns() {
        let mut row = SqlRow::new();
        row.set("COLUMN_TYPE", Some("enum('a','b')".to_string()));
        assert_eq!(row.get("column_type"), Some("enum('a','b')"));
        assert_eq!(row.get("Column_Type"), Some("enum('a','b')"));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_sql_row_typed_accessors() {
        let mut row = SqlRow::new();
        row.set("min_value", Some(" 1 ".to_string()));
        row.set("big", Some("170141183460469231731687303715884105727".to_string()));
        row.set("cycle", Some("YES".to_string()));
        row.set("junk", Some("abc".to_string()));

        assert_eq!(row.get_i64("min_value"), Some(1));
        assert_eq!(row.get_i128("big"), Some(i128::MAX));
        assert_eq!(row.get_bool("cycle"), Some(true));
        assert_eq!(row.get_i64("junk"), None);
        assert_eq!(row.get_bool("junk"), None);
    }
}
