//! Connection-scoped, memoizing metadata cache.
//!
//! Wraps a [`MetadataProvider`] and caches raw rows keyed by
//! (catalog, schema, table). Bulk fetching is adaptive: the first few
//! lookups for an object kind go to the provider per table, and once
//! [`BULK_FETCH_THRESHOLD`] single lookups have been observed for the same
//! schema the next lookup fetches the whole schema in one round trip. Small
//! schemas never pay bulk overhead; large ones avoid N+1 query storms.
//!
//! The cache lives exactly as long as one snapshot and is owned by it —
//! never process-global, so concurrent snapshots against same-named schemas
//! on different connections cannot observe each other's rows.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::model::NameMatcher;

use super::provider::{
    ColumnRow, ForeignKeyRow, IndexRow, MetadataProvider, PrimaryKeyRow, RelationRow, SequenceRow,
    UniqueConstraintRow,
};

/// Single lookups per (kind, schema) before switching to bulk fetches.
pub const BULK_FETCH_THRESHOLD: usize = 3;

/// How a lookup will be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchPlan {
    /// Served from cached rows.
    Cached,
    /// One per-table provider query, stored under the carried key.
    Single(String),
    /// One whole-schema provider query.
    Bulk,
}

/// Per-object-kind cache state.
struct KindState<R> {
    /// Rows keyed by folded (catalog, schema, table).
    by_table: HashMap<String, Vec<R>>,
    /// Whole-schema row lists, in provider order, for bulk-mode serving.
    by_schema: HashMap<String, Vec<R>>,
    /// Schemas that have been bulk-loaded.
    bulk_loaded: HashSet<String>,
    /// Single-lookup counter per schema.
    single_lookups: HashMap<String, usize>,
}

impl<R: Clone> KindState<R> {
    fn new() -> Self {
        Self {
            by_table: HashMap::new(),
            by_schema: HashMap::new(),
            bulk_loaded: HashSet::new(),
            single_lookups: HashMap::new(),
        }
    }

    fn plan(&mut self, schema_key: &str, table_key: Option<&str>, threshold: usize) -> FetchPlan {
        match table_key {
            None => {
                if self.bulk_loaded.contains(schema_key) {
                    FetchPlan::Cached
                } else {
                    FetchPlan::Bulk
                }
            }
            Some(table_key) => {
                if self.bulk_loaded.contains(schema_key) || self.by_table.contains_key(table_key) {
                    return FetchPlan::Cached;
                }
                let seen = self
                    .single_lookups
                    .get(schema_key)
                    .copied()
                    .unwrap_or(0);
                if seen >= threshold {
                    FetchPlan::Bulk
                } else {
                    *self.single_lookups.entry(schema_key.to_string()).or_insert(0) += 1;
                    FetchPlan::Single(table_key.to_string())
                }
            }
        }
    }

    fn store_single(&mut self, table_key: &str, rows: Vec<R>) {
        self.by_table.insert(table_key.to_string(), rows);
    }

    fn store_bulk(
        &mut self,
        schema_key: &str,
        rows: Vec<R>,
        table_key_of: impl Fn(&R) -> String,
    ) {
        // A bulk load supersedes any earlier single fetches for the schema.
        let prefix = format!("{}\u{1}", schema_key);
        self.by_table.retain(|key, _| !key.starts_with(&prefix));
        for row in &rows {
            self.by_table
                .entry(table_key_of(row))
                .or_default()
                .push(row.clone());
        }
        self.by_schema.insert(schema_key.to_string(), rows);
        self.bulk_loaded.insert(schema_key.to_string());
    }

    fn cached(&self, schema_key: &str, table_key: Option<&str>) -> Vec<R> {
        match table_key {
            None => self.by_schema.get(schema_key).cloned().unwrap_or_default(),
            Some(table_key) => self.by_table.get(table_key).cloned().unwrap_or_default(),
        }
    }
}

/// Memoizing layer over the raw metadata interface.
///
/// One instance per snapshot invocation.
pub struct MetadataCache {
    provider: Arc<dyn MetadataProvider>,
    matcher: NameMatcher,
    threshold: usize,
    relations: KindState<RelationRow>,
    columns: KindState<ColumnRow>,
    primary_keys: KindState<PrimaryKeyRow>,
    foreign_keys: KindState<ForeignKeyRow>,
    unique_constraints: KindState<UniqueConstraintRow>,
    indexes: KindState<IndexRow>,
    sequences: HashMap<String, Vec<SequenceRow>>,
}

impl MetadataCache {
    pub fn new(provider: Arc<dyn MetadataProvider>, matcher: NameMatcher) -> Self {
        Self::with_threshold(provider, matcher, BULK_FETCH_THRESHOLD)
    }

    pub fn with_threshold(
        provider: Arc<dyn MetadataProvider>,
        matcher: NameMatcher,
        threshold: usize,
    ) -> Self {
        Self {
            provider,
            matcher,
            threshold,
            relations: KindState::new(),
            columns: KindState::new(),
            primary_keys: KindState::new(),
            foreign_keys: KindState::new(),
            unique_constraints: KindState::new(),
            indexes: KindState::new(),
            sequences: HashMap::new(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    fn schema_key(&self, catalog: Option<&str>, schema: &str) -> String {
        format!(
            "{}\u{1}{}",
            self.matcher.fold(catalog.unwrap_or("")),
            self.matcher.fold(schema)
        )
    }

    fn table_key(&self, catalog: Option<&str>, schema: &str, table: &str) -> String {
        format!(
            "{}\u{1}{}",
            self.schema_key(catalog, schema),
            self.matcher.fold(table)
        )
    }

    /// Tables and views for a schema (always fetched in bulk) or one table.
    pub async fn relations(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<RelationRow>> {
        let schema_key = self.schema_key(catalog, schema);
        let table_key = table.map(|t| self.table_key(catalog, schema, t));
        match self
            .relations
            .plan(&schema_key, table_key.as_deref(), self.threshold)
        {
            FetchPlan::Cached => Ok(self.relations.cached(&schema_key, table_key.as_deref())),
            FetchPlan::Single(key) => {
                let rows = self.provider.relations(catalog, schema, table).await?;
                self.relations.store_single(&key, rows.clone());
                Ok(rows)
            }
            FetchPlan::Bulk => {
                debug!(schema, "bulk-fetching relations");
                let rows = self.provider.relations(catalog, schema, None).await?;
                let matcher = self.matcher;
                let prefix = schema_key.clone();
                self.relations.store_bulk(&schema_key, rows, |r| {
                    format!("{}\u{1}{}", prefix, matcher.fold(&r.name))
                });
                Ok(self.relations.cached(&schema_key, table_key.as_deref()))
            }
        }
    }

    /// Column rows for one table, or the whole schema when `table` is None.
    pub async fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ColumnRow>> {
        let schema_key = self.schema_key(catalog, schema);
        let table_key = table.map(|t| self.table_key(catalog, schema, t));
        match self
            .columns
            .plan(&schema_key, table_key.as_deref(), self.threshold)
        {
            FetchPlan::Cached => Ok(self.columns.cached(&schema_key, table_key.as_deref())),
            FetchPlan::Single(key) => {
                let rows = self.provider.columns(catalog, schema, table).await?;
                self.columns.store_single(&key, rows.clone());
                Ok(rows)
            }
            FetchPlan::Bulk => {
                debug!(schema, "bulk-fetching columns");
                let rows = self.provider.columns(catalog, schema, None).await?;
                let matcher = self.matcher;
                let prefix = schema_key.clone();
                self.columns.store_bulk(&schema_key, rows, |r| {
                    format!("{}\u{1}{}", prefix, matcher.fold(&r.table))
                });
                Ok(self.columns.cached(&schema_key, table_key.as_deref()))
            }
        }
    }

    /// Primary key rows.
    pub async fn primary_keys(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<PrimaryKeyRow>> {
        let schema_key = self.schema_key(catalog, schema);
        let table_key = table.map(|t| self.table_key(catalog, schema, t));
        match self
            .primary_keys
            .plan(&schema_key, table_key.as_deref(), self.threshold)
        {
            FetchPlan::Cached => Ok(self.primary_keys.cached(&schema_key, table_key.as_deref())),
            FetchPlan::Single(key) => {
                let rows = self.provider.primary_keys(catalog, schema, table).await?;
                self.primary_keys.store_single(&key, rows.clone());
                Ok(rows)
            }
            FetchPlan::Bulk => {
                debug!(schema, "bulk-fetching primary keys");
                let rows = self.provider.primary_keys(catalog, schema, None).await?;
                let matcher = self.matcher;
                let prefix = schema_key.clone();
                self.primary_keys.store_bulk(&schema_key, rows, |r| {
                    format!("{}\u{1}{}", prefix, matcher.fold(&r.table))
                });
                Ok(self.primary_keys.cached(&schema_key, table_key.as_deref()))
            }
        }
    }

    /// Foreign key rows.
    pub async fn foreign_keys(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRow>> {
        let schema_key = self.schema_key(catalog, schema);
        let table_key = table.map(|t| self.table_key(catalog, schema, t));
        match self
            .foreign_keys
            .plan(&schema_key, table_key.as_deref(), self.threshold)
        {
            FetchPlan::Cached => Ok(self.foreign_keys.cached(&schema_key, table_key.as_deref())),
            FetchPlan::Single(key) => {
                let rows = self.provider.foreign_keys(catalog, schema, table).await?;
                self.foreign_keys.store_single(&key, rows.clone());
                Ok(rows)
            }
            FetchPlan::Bulk => {
                debug!(schema, "bulk-fetching foreign keys");
                let rows = self.provider.foreign_keys(catalog, schema, None).await?;
                let matcher = self.matcher;
                let prefix = schema_key.clone();
                self.foreign_keys.store_bulk(&schema_key, rows, |r| {
                    format!("{}\u{1}{}", prefix, matcher.fold(&r.table))
                });
                Ok(self.foreign_keys.cached(&schema_key, table_key.as_deref()))
            }
        }
    }

    /// Unique constraint rows.
    pub async fn unique_constraints(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<UniqueConstraintRow>> {
        let schema_key = self.schema_key(catalog, schema);
        let table_key = table.map(|t| self.table_key(catalog, schema, t));
        match self
            .unique_constraints
            .plan(&schema_key, table_key.as_deref(), self.threshold)
        {
            FetchPlan::Cached => Ok(self
                .unique_constraints
                .cached(&schema_key, table_key.as_deref())),
            FetchPlan::Single(key) => {
                let rows = self
                    .provider
                    .unique_constraints(catalog, schema, table)
                    .await?;
                self.unique_constraints.store_single(&key, rows.clone());
                Ok(rows)
            }
            FetchPlan::Bulk => {
                debug!(schema, "bulk-fetching unique constraints");
                let rows = self
                    .provider
                    .unique_constraints(catalog, schema, None)
                    .await?;
                let matcher = self.matcher;
                let prefix = schema_key.clone();
                self.unique_constraints.store_bulk(&schema_key, rows, |r| {
                    format!("{}\u{1}{}", prefix, matcher.fold(&r.table))
                });
                Ok(self
                    .unique_constraints
                    .cached(&schema_key, table_key.as_deref()))
            }
        }
    }

    /// Index rows.
    pub async fn indexes(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<IndexRow>> {
        let schema_key = self.schema_key(catalog, schema);
        let table_key = table.map(|t| self.table_key(catalog, schema, t));
        match self
            .indexes
            .plan(&schema_key, table_key.as_deref(), self.threshold)
        {
            FetchPlan::Cached => Ok(self.indexes.cached(&schema_key, table_key.as_deref())),
            FetchPlan::Single(key) => {
                let rows = self.provider.indexes(catalog, schema, table).await?;
                self.indexes.store_single(&key, rows.clone());
                Ok(rows)
            }
            FetchPlan::Bulk => {
                debug!(schema, "bulk-fetching indexes");
                let rows = self.provider.indexes(catalog, schema, None).await?;
                let matcher = self.matcher;
                let prefix = schema_key.clone();
                self.indexes.store_bulk(&schema_key, rows, |r| {
                    format!("{}\u{1}{}", prefix, matcher.fold(&r.table))
                });
                Ok(self.indexes.cached(&schema_key, table_key.as_deref()))
            }
        }
    }

    /// Sequence rows for a schema. Always a whole-schema fetch.
    pub async fn sequences(
        &mut self,
        catalog: Option<&str>,
        schema: &str,
    ) -> Result<Vec<SequenceRow>> {
        let schema_key = self.schema_key(catalog, schema);
        if let Some(rows) = self.sequences.get(&schema_key) {
            return Ok(rows.clone());
        }
        let rows = self.provider.sequences(catalog, schema).await?;
        self.sequences.insert(schema_key, rows.clone());
        Ok(rows)
    }
}
