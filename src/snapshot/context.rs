//! Per-snapshot working state shared with generators.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::meta::{MetadataCache, MetadataProvider, SqlRow};
use crate::model::{NameMatcher, Snapshot, SnapshotWarning};
use crate::registry::{GeneratorRegistry, ObjectKind};
use crate::vendor::VendorId;

/// Caller-supplied object-kind inclusion filter.
///
/// Consulted before each phase runs, so excluded kinds cost no queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectFilter {
    pub tables: bool,
    pub views: bool,
    pub columns: bool,
    pub primary_keys: bool,
    pub foreign_keys: bool,
    pub unique_constraints: bool,
    pub indexes: bool,
    pub sequences: bool,
}

impl ObjectFilter {
    /// Include every object kind.
    pub fn all() -> Self {
        Self {
            tables: true,
            views: true,
            columns: true,
            primary_keys: true,
            foreign_keys: true,
            unique_constraints: true,
            indexes: true,
            sequences: true,
        }
    }

    pub fn includes(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Table => self.tables,
            ObjectKind::View => self.views,
            ObjectKind::Column => self.columns,
            ObjectKind::PrimaryKey => self.primary_keys,
            ObjectKind::ForeignKey => self.foreign_keys,
            ObjectKind::UniqueConstraint => self.unique_constraints,
            ObjectKind::Index => self.indexes,
            ObjectKind::Sequence => self.sequences,
        }
    }

    /// Exclude one kind, keeping the rest.
    pub fn without(mut self, kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Table => self.tables = false,
            ObjectKind::View => self.views = false,
            ObjectKind::Column => self.columns = false,
            ObjectKind::PrimaryKey => self.primary_keys = false,
            ObjectKind::ForeignKey => self.foreign_keys = false,
            ObjectKind::UniqueConstraint => self.unique_constraints = false,
            ObjectKind::Index => self.indexes = false,
            ObjectKind::Sequence => self.sequences = false,
        }
        self
    }
}

impl Default for ObjectFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Scope and tuning for one snapshot invocation.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Catalog to scope the scan to, where the vendor has catalogs.
    pub catalog: Option<String>,

    /// Schemas to scan.
    pub schemas: Vec<String>,

    /// Tables excluded by name — the internal change-tracking ledger the
    /// downstream migration tooling maintains.
    pub exclude_tables: Vec<String>,

    /// Object kinds to include.
    pub filter: ObjectFilter,

    /// Single lookups per (kind, schema) before switching to bulk fetches.
    pub bulk_threshold: usize,
}

impl SnapshotOptions {
    pub fn for_schema(schema: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schemas: vec![schema.into()],
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: ObjectFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            catalog: None,
            schemas: Vec::new(),
            exclude_tables: vec![
                "schemasnap_changelog".to_string(),
                "schemasnap_changelog_lock".to_string(),
            ],
            filter: ObjectFilter::all(),
            bulk_threshold: crate::meta::BULK_FETCH_THRESHOLD,
        }
    }
}

/// Working state handed to each generator.
///
/// Owns the snapshot being assembled, the per-invocation metadata cache,
/// and a memo for secondary vendor queries. Dropped when the snapshot is
/// returned, so nothing here outlives or crosses snapshot invocations.
pub struct SnapshotContext<'a> {
    pub vendor: VendorId,
    pub options: &'a SnapshotOptions,
    pub registry: Arc<GeneratorRegistry>,
    pub cache: MetadataCache,
    pub snapshot: Snapshot,
    secondary_queries: HashMap<String, Arc<Vec<SqlRow>>>,
}

impl<'a> SnapshotContext<'a> {
    pub fn new(
        registry: Arc<GeneratorRegistry>,
        provider: Arc<dyn MetadataProvider>,
        options: &'a SnapshotOptions,
    ) -> Self {
        let vendor = provider.vendor();
        let matcher = NameMatcher::for_vendor(&vendor);
        let snapshot = Snapshot::new(
            vendor,
            options.catalog.clone(),
            options.schemas.clone(),
        );
        Self {
            vendor,
            options,
            registry,
            cache: MetadataCache::with_threshold(provider, matcher, options.bulk_threshold),
            snapshot,
            secondary_queries: HashMap::new(),
        }
    }

    pub fn matcher(&self) -> NameMatcher {
        self.snapshot.matcher()
    }

    pub fn provider(&self) -> Arc<dyn MetadataProvider> {
        Arc::clone(self.cache.provider())
    }

    pub fn catalog(&self) -> Option<&str> {
        self.options.catalog.as_deref()
    }

    /// Record a non-fatal problem: log it and keep it on the snapshot.
    pub fn warn(
        &mut self,
        kind: ObjectKind,
        object: impl Into<String>,
        message: impl Into<String>,
    ) {
        let object = object.into();
        let message = message.into();
        warn!(phase = kind.phase_name(), %object, "{}", message);
        self.snapshot
            .warnings
            .push(SnapshotWarning::new(kind.phase_name(), object, message));
    }

    /// Run a secondary vendor query, memoized per key for this snapshot.
    ///
    /// Vendor strategies use this for per-table lookups (enum definitions)
    /// so each table is queried at most once per snapshot.
    pub async fn cached_query(&mut self, key: &str, sql: &str) -> Result<Arc<Vec<SqlRow>>> {
        if let Some(rows) = self.secondary_queries.get(key) {
            return Ok(Arc::clone(rows));
        }
        let rows = Arc::new(self.provider().query(sql).await?);
        self.secondary_queries
            .insert(key.to_string(), Arc::clone(&rows));
        Ok(rows)
    }

    /// Whether a table name is excluded as an internal tracking table.
    pub fn is_excluded_table(&self, name: &str) -> bool {
        let matcher = self.matcher();
        self.options
            .exclude_tables
            .iter()
            .any(|excluded| matcher.eq(excluded, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_without() {
        let filter = ObjectFilter::all().without(ObjectKind::Index);
        assert!(!filter.includes(ObjectKind::Index));
        assert!(filter.includes(ObjectKind::Table));
        assert!(filter.includes(ObjectKind::Sequence));
    }

    #[test]
    fn test_default_options_exclude_tracking_tables() {
        let options = SnapshotOptions::for_schema("public");
        assert_eq!(options.schemas, vec!["public"]);
        assert!(options
            .exclude_tables
            .iter()
            .any(|t| t == "schemasnap_changelog"));
    }
}
