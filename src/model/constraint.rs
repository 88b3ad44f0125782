//! Keys, unique constraints, and indexes.

use serde::{Deserialize, Serialize};

use super::name::compare_names;
use super::relation::RelationRef;

/// Canonical referential action for FK update/delete rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// Which constraint a backing index enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociatedWith {
    PrimaryKey,
    ForeignKey,
    UniqueConstraint,
}

/// Index metadata.
///
/// An index that merely backs a PK/FK/unique constraint is excluded from
/// the table's free-standing index set and attached to its constraint
/// instead, tagged via `associated_with`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Owning table.
    pub table: RelationRef,

    /// Indexed column names; order is significant.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,

    /// Partial-index predicate, where supported.
    pub predicate: Option<String>,

    /// Set when the index exists only to enforce a constraint.
    pub associated_with: Option<AssociatedWith>,
}

impl Index {
    /// A minimally populated index usable as a lookup example.
    pub fn named(table: RelationRef, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table,
            columns: Vec::new(),
            unique: false,
            predicate: None,
            associated_with: None,
        }
    }
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Index {}

impl PartialOrd for Index {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Index {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_names(&self.table.schema, &other.table.schema)
            .then(compare_names(&self.table.name, &other.table.name))
            .then(compare_names(&self.name, &other.name))
    }
}

/// Primary key metadata. At most one per table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name.
    pub name: String,

    /// Owning table.
    pub table: RelationRef,

    /// Key columns in declared key-sequence order.
    pub columns: Vec<String>,

    /// Tablespace holding the key's index, where reported.
    pub tablespace: Option<String>,

    /// The index that enforces this key, when one was discovered.
    pub backing_index: Option<Index>,
}

impl PrimaryKey {
    pub fn new(table: RelationRef, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table,
            columns: Vec::new(),
            tablespace: None,
            backing_index: None,
        }
    }
}

impl PartialEq for PrimaryKey {
    fn eq(&self, other: &Self) -> bool {
        compare_names(&self.table.schema, &other.table.schema).is_eq()
            && compare_names(&self.table.name, &other.table.name).is_eq()
            && compare_names(&self.name, &other.name).is_eq()
    }
}

impl Eq for PrimaryKey {}

/// Foreign key metadata.
///
/// The referenced table may lie outside the snapshot scope; in that case a
/// stub table is registered in the snapshot and `resolved` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Table declaring the constraint.
    pub table: RelationRef,

    /// FK columns on the declaring table, in key order.
    pub columns: Vec<String>,

    /// Referenced table (possibly a stub).
    pub referenced_table: RelationRef,

    /// Referenced (PK/unique) columns, in key order.
    pub referenced_columns: Vec<String>,

    /// ON UPDATE action.
    pub update_rule: ReferentialAction,

    /// ON DELETE action.
    pub delete_rule: ReferentialAction,

    /// Whether the constraint is deferrable.
    pub deferrable: bool,

    /// Whether the constraint is initially deferred.
    pub initially_deferred: bool,

    /// False when the referenced table was out of snapshot scope and only a
    /// stub exists for it.
    pub resolved: bool,
}

impl PartialEq for ForeignKey {
    fn eq(&self, other: &Self) -> bool {
        compare_names(&self.table.schema, &other.table.schema).is_eq()
            && compare_names(&self.table.name, &other.table.name).is_eq()
            && compare_names(&self.name, &other.name).is_eq()
    }
}

impl Eq for ForeignKey {}

/// Unique constraint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,

    /// Owning table.
    pub table: RelationRef,

    /// Constrained columns, in declared order.
    pub columns: Vec<String>,

    /// Whether the constraint is deferrable.
    pub deferrable: bool,

    /// Whether the constraint is initially deferred.
    pub initially_deferred: bool,

    /// Whether the constraint is disabled (Oracle).
    pub disabled: bool,

    /// Name of the index enforcing the constraint, as reported by the vendor.
    pub backing_index_name: Option<String>,

    /// The enforcing index itself, attached during the index phase.
    pub backing_index: Option<Index>,
}

impl UniqueConstraint {
    pub fn new(table: RelationRef, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table,
            columns: Vec::new(),
            deferrable: false,
            initially_deferred: false,
            disabled: false,
            backing_index_name: None,
            backing_index: None,
        }
    }
}

impl PartialEq for UniqueConstraint {
    fn eq(&self, other: &Self) -> bool {
        compare_names(&self.table.schema, &other.table.schema).is_eq()
            && compare_names(&self.table.name, &other.table.name).is_eq()
            && compare_names(&self.name, &other.name).is_eq()
    }
}

impl Eq for UniqueConstraint {}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_ref() -> RelationRef {
        RelationRef::new("public", "orders")
    }

    #[test]
    fn test_index_lookup_example_equality() {
        let mut full = Index::named(table_ref(), "idx_orders_customer");
        full.columns = vec!["customer_id".into()];
        full.unique = true;

        let example = Index::named(table_ref(), "IDX_ORDERS_CUSTOMER");
        assert_eq!(full, example);
    }

    #[test]
    fn test_index_ordering_by_table_then_name() {
        let mut indexes = vec![
            Index::named(RelationRef::new("public", "b"), "idx_2"),
            Index::named(RelationRef::new("public", "a"), "idx_9"),
            Index::named(RelationRef::new("public", "b"), "idx_1"),
        ];
        indexes.sort();
        let names: Vec<&str> = indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["idx_9", "idx_1", "idx_2"]);
    }

    #[test]
    fn test_referential_action_sql() {
        assert_eq!(ReferentialAction::SetNull.as_sql(), "SET NULL");
        assert_eq!(ReferentialAction::NoAction.as_sql(), "NO ACTION");
    }

    #[test]
    fn test_primary_key_identity() {
        let a = PrimaryKey::new(table_ref(), "pk_orders");
        let mut b = PrimaryKey::new(table_ref(), "PK_ORDERS");
        b.columns = vec!["id".into()];
        assert_eq!(a, b);
    }
}
