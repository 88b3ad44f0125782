//! Sequence metadata.

use serde::{Deserialize, Serialize};

use super::name::compare_names;

/// Sequence metadata.
///
/// Attribute fields are `None` when the vendor did not report them or when
/// they match the vendor's built-in default (suppressed to keep generated
/// change-logs minimal). Absent never means zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence name.
    pub name: String,

    /// Schema name.
    pub schema: String,

    /// First value.
    pub start_value: Option<i128>,

    /// Minimum value.
    pub min_value: Option<i128>,

    /// Maximum value.
    pub max_value: Option<i128>,

    /// Step between generated values.
    pub increment_by: Option<i128>,

    /// Number of preallocated values.
    pub cache_size: Option<i128>,

    /// Whether the sequence wraps around.
    pub cycle: Option<bool>,

    /// Whether values are guaranteed to be generated in order (Oracle).
    pub ordered: Option<bool>,

    /// Declared data type, where the vendor has typed sequences.
    pub data_type: Option<String>,
}

impl Sequence {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            start_value: None,
            min_value: None,
            max_value: None,
            increment_by: None,
            cache_size: None,
            cycle: None,
            ordered: None,
            data_type: None,
        }
    }

    /// Get the fully qualified sequence name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Sequence {}

impl PartialOrd for Sequence {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sequence {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_names(&self.schema, &other.schema).then(compare_names(&self.name, &other.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_attributes_are_none() {
        let seq = Sequence::new("public", "order_id_seq");
        assert_eq!(seq.start_value, None);
        assert_eq!(seq.cache_size, None);
        assert_eq!(seq.cycle, None);
    }

    #[test]
    fn test_identity() {
        let a = Sequence::new("public", "s1");
        let mut b = Sequence::new("PUBLIC", "S1");
        b.increment_by = Some(10);
        assert_eq!(a, b);
    }
}
