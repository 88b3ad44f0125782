//! Tables, views, and relation identity.

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::name::compare_names;

/// Sentinel stored as a view's definition when the database denies access
/// to the defining query text. Never `None`: downstream diffing must be
/// able to distinguish "no permission" from "definition not yet fetched".
pub const VIEW_DEFINITION_UNAVAILABLE: &str = "[view definition unavailable]";

/// What kind of relation a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Table,
    View,
}

/// Identity of a relation within a snapshot: (schema, name).
///
/// Cross-references between entities (column→table, index→table,
/// FK→both tables) are by `RelationRef`, resolved through the snapshot's
/// lookup operations, never by shared pointers into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationRef {
    pub schema: String,
    pub name: String,
}

impl RelationRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RelationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Schema name.
    pub schema: String,

    /// Table name (unique within its schema).
    pub name: String,

    /// Table comment.
    pub remarks: Option<String>,

    /// Ordered column definitions.
    pub columns: Vec<Column>,

    /// Default tablespace, where the vendor reports one.
    pub tablespace: Option<String>,

    /// True for minimally-populated stand-ins created to satisfy a foreign
    /// key referencing a table outside the snapshot scope.
    pub is_stub: bool,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            remarks: None,
            columns: Vec::new(),
            tablespace: None,
            is_stub: false,
        }
    }

    /// A stub table: name and schema only, no columns.
    pub fn stub(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let mut table = Self::new(schema, name);
        table.is_stub = true;
        table
    }

    /// Identity of this table within the snapshot.
    pub fn relation_ref(&self) -> RelationRef {
        RelationRef::new(self.schema.clone(), self.name.clone())
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Table {}

impl PartialOrd for Table {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Table {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_names(&self.schema, &other.schema).then(compare_names(&self.name, &other.name))
    }
}

/// View metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    /// Schema name.
    pub schema: String,

    /// View name (unique within its schema).
    pub name: String,

    /// Defining query text, or [`VIEW_DEFINITION_UNAVAILABLE`].
    pub definition: String,

    /// View comment.
    pub remarks: Option<String>,

    /// Ordered column definitions.
    pub columns: Vec<Column>,
}

impl View {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: String::new(),
            remarks: None,
            columns: Vec::new(),
        }
    }

    /// Identity of this view within the snapshot.
    pub fn relation_ref(&self) -> RelationRef {
        RelationRef::new(self.schema.clone(), self.name.clone())
    }

    /// Get the fully qualified view name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Whether the definition could not be read (permission sentinel).
    pub fn definition_unavailable(&self) -> bool {
        self.definition == VIEW_DEFINITION_UNAVAILABLE
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for View {}

impl PartialOrd for View {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for View {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_names(&self.schema, &other.schema).then(compare_names(&self.name, &other.name))
    }
}
