//! The snapshot object graph and its lookup operations.

use serde::{Deserialize, Serialize};

use crate::vendor::VendorId;

use super::column::Column;
use super::constraint::{ForeignKey, Index, PrimaryKey, UniqueConstraint};
use super::name::NameMatcher;
use super::relation::{RelationRef, Table, View};
use super::sequence::Sequence;

/// A non-fatal problem recovered during a snapshot.
///
/// Warnings accumulate on the snapshot instead of aborting it; callers that
/// want stricter semantics can inspect them after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotWarning {
    /// Scan phase that recovered the problem (e.g. "indexes").
    pub phase: String,
    /// Object the problem relates to.
    pub object: String,
    /// Human-readable description.
    pub message: String,
}

impl SnapshotWarning {
    pub fn new(
        phase: impl Into<String>,
        object: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase: phase.into(),
            object: object.into(),
            message: message.into(),
        }
    }
}

/// The complete, point-in-time object graph describing a schema.
///
/// Built fresh per invocation and read-only once returned; callers needing
/// a newer view request a new snapshot. Collections are kept in the
/// deterministic order defined by each entity's `Ord`, so serializing two
/// snapshots of the same unchanged schema yields identical output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Vendor the snapshot was taken from.
    pub vendor: VendorId,

    /// Catalog the scan was scoped to, if the vendor has catalogs.
    pub catalog: Option<String>,

    /// Schemas that were scanned.
    pub schemas: Vec<String>,

    /// Tables, ordered by (schema, name).
    pub tables: Vec<Table>,

    /// Stub tables created for out-of-scope foreign key targets.
    pub stub_tables: Vec<Table>,

    /// Views, ordered by (schema, name).
    pub views: Vec<View>,

    /// Primary keys, at most one per table.
    pub primary_keys: Vec<PrimaryKey>,

    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKey>,

    /// Unique constraints.
    pub unique_constraints: Vec<UniqueConstraint>,

    /// Free-standing indexes (constraint-backing indexes excluded).
    pub indexes: Vec<Index>,

    /// Sequences, empty when the vendor has none.
    pub sequences: Vec<Sequence>,

    /// Non-fatal problems recovered during the scan.
    pub warnings: Vec<SnapshotWarning>,

    matcher: NameMatcher,
}

impl Snapshot {
    pub fn new(vendor: VendorId, catalog: Option<String>, schemas: Vec<String>) -> Self {
        Self {
            vendor,
            catalog,
            schemas,
            tables: Vec::new(),
            stub_tables: Vec::new(),
            views: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            indexes: Vec::new(),
            sequences: Vec::new(),
            warnings: Vec::new(),
            matcher: NameMatcher::for_vendor(&vendor),
        }
    }

    /// The name comparator for this snapshot's dialect.
    pub fn matcher(&self) -> NameMatcher {
        self.matcher
    }

    /// Find a table by schema and name, honoring dialect case rules.
    pub fn find_table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| self.matcher.eq(&t.schema, schema) && self.matcher.eq(&t.name, name))
    }

    /// Find a view by schema and name.
    pub fn find_view(&self, schema: &str, name: &str) -> Option<&View> {
        self.views
            .iter()
            .find(|v| self.matcher.eq(&v.schema, schema) && self.matcher.eq(&v.name, name))
    }

    /// Find any relation, table or view, by schema and name.
    pub fn find_relation(&self, schema: &str, name: &str) -> Option<RelationRef> {
        self.find_table(schema, name)
            .map(Table::relation_ref)
            .or_else(|| self.find_view(schema, name).map(View::relation_ref))
    }

    /// Find a column on a table or view.
    pub fn find_column(&self, relation: &RelationRef, name: &str) -> Option<&Column> {
        let columns = self
            .find_table(&relation.schema, &relation.name)
            .map(|t| &t.columns)
            .or_else(|| {
                self.find_view(&relation.schema, &relation.name)
                    .map(|v| &v.columns)
            })?;
        columns.iter().find(|c| self.matcher.eq(&c.name, name))
    }

    /// Find a table's primary key.
    pub fn find_primary_key(&self, table: &RelationRef) -> Option<&PrimaryKey> {
        self.primary_keys.iter().find(|pk| {
            self.matcher.eq(&pk.table.schema, table.schema.as_str())
                && self.matcher.eq(&pk.table.name, table.name.as_str())
        })
    }

    /// Find a foreign key by constraint name.
    pub fn find_foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| self.matcher.eq(&fk.name, name))
    }

    /// Find a unique constraint by constraint name.
    pub fn find_unique_constraint(&self, name: &str) -> Option<&UniqueConstraint> {
        self.unique_constraints
            .iter()
            .find(|uc| self.matcher.eq(&uc.name, name))
    }

    /// Find a free-standing index by table and name.
    pub fn find_index(&self, table: &RelationRef, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|idx| {
            self.matcher.eq(&idx.table.schema, table.schema.as_str())
                && self.matcher.eq(&idx.table.name, table.name.as_str())
                && self.matcher.eq(&idx.name, name)
        })
    }

    /// Find a sequence by schema and name.
    pub fn find_sequence(&self, schema: &str, name: &str) -> Option<&Sequence> {
        self.sequences
            .iter()
            .find(|s| self.matcher.eq(&s.schema, schema) && self.matcher.eq(&s.name, name))
    }

    /// Resolve a foreign key's referenced table, falling back to its stub.
    pub fn referenced_table(&self, fk: &ForeignKey) -> Option<&Table> {
        self.find_table(&fk.referenced_table.schema, &fk.referenced_table.name)
            .or_else(|| {
                self.stub_tables.iter().find(|t| {
                    self.matcher.eq(&t.schema, &fk.referenced_table.schema)
                        && self.matcher.eq(&t.name, &fk.referenced_table.name)
                })
            })
    }

    /// Sort every collection into its deterministic order.
    ///
    /// Called once by the orchestrator before the snapshot is returned.
    pub fn finalize_ordering(&mut self) {
        self.tables.sort();
        self.stub_tables.sort();
        self.views.sort();
        self.sequences.sort();
        self.indexes.sort();
        self.primary_keys
            .sort_by(|a, b| a.table.cmp_key().cmp(&b.table.cmp_key()));
        self.foreign_keys.sort_by(|a, b| {
            a.table
                .cmp_key()
                .cmp(&b.table.cmp_key())
                .then_with(|| super::name::compare_names(&a.name, &b.name))
        });
        self.unique_constraints.sort_by(|a, b| {
            a.table
                .cmp_key()
                .cmp(&b.table.cmp_key())
                .then_with(|| super::name::compare_names(&a.name, &b.name))
        });
        // Column order within a relation is ordinal order and is never
        // re-sorted here.
    }
}

impl RelationRef {
    /// Deterministic ordering key for sorting by (schema, name).
    fn cmp_key(&self) -> (String, String, String, String) {
        let (s1, s2) = super::name::order_key(&self.schema);
        let (n1, n2) = super::name::order_key(&self.name);
        (s1, n1, s2, n2)
    }
}
