//! Column metadata and default values.

use serde::{Deserialize, Serialize};

use super::name::compare_names;
use super::types::DataType;

/// A parsed column default.
///
/// Vendors report defaults as text; classification distinguishes literals
/// (typed per column), function-call expressions (kept verbatim), sequence
/// references, and "no default". Text that defies classification falls back
/// to an opaque string literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// A typed literal value.
    Literal(LiteralValue),
    /// A function call or expression, kept verbatim.
    Function(String),
    /// A reference to a sequence's next value.
    SequenceRef(String),
}

/// A typed default literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralValue::Int(v) => write!(f, "{}", v),
            LiteralValue::Float(v) => write!(f, "{}", v),
            LiteralValue::Bool(v) => write!(f, "{}", v),
            LiteralValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Auto-increment (identity/serial) attributes of a column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoIncrementInfo {
    /// First generated value, when the vendor reports it.
    pub start_with: Option<i64>,
    /// Generation step, when the vendor reports it.
    pub increment_by: Option<i64>,
    /// Backing sequence name, for sequence-implemented identities.
    pub sequence_name: Option<String>,
}

/// Column metadata.
///
/// A column belongs to exactly one table or one view, identified by
/// `relation` within the owning snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Canonical data type.
    pub data_type: DataType,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Parsed default value, if any.
    pub default_value: Option<DefaultValue>,

    /// Column comment.
    pub remarks: Option<String>,

    /// Identity/serial attributes; `None` for plain columns.
    pub auto_increment: Option<AutoIncrementInfo>,

    /// Whether the column participates in its table's primary key.
    pub is_primary_key: bool,

    /// Ordinal position (1-based, gap-free after repair).
    pub ordinal: u32,
}

impl Column {
    /// A minimally populated column usable as a lookup example.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::plain(""),
            nullable: true,
            default_value: None,
            remarks: None,
            auto_increment: None,
            is_primary_key: false,
            ordinal: 0,
        }
    }
}

// Identity is the column name within its relation; two Column values are
// equal iff their names match, independent of population level.
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        compare_names(&self.name, &other.name) == std::cmp::Ordering::Equal
    }
}

impl Eq for Column {}

impl PartialOrd for Column {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Column {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_names(&self.name, &other.name)
    }
}
