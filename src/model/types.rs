//! Canonical column type descriptors.

use serde::{Deserialize, Serialize};

/// Unit of a character type's declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeUnit {
    Byte,
    Char,
}

/// Canonical, vendor-reconciled column type.
///
/// Produced by the normalizer from raw (type-code, type-name, size,
/// precision, scale, unit-hint) tuples. Which fields are populated follows
/// the storage-semantics rules: fixed-storage types carry nothing,
/// character types carry `size` (+ unit), numeric types carry
/// `precision`/`scale`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataType {
    /// Canonical type name (e.g. "integer", "varchar", "numeric").
    pub name: String,

    /// Declared size for character/binary types. `None` for fixed-storage
    /// types; `Some(0)` never appears (0 is treated as unreported).
    pub size: Option<u32>,

    /// Byte vs character semantics of `size`, where the vendor distinguishes.
    pub size_unit: Option<SizeUnit>,

    /// Numeric precision.
    pub precision: Option<u32>,

    /// Numeric scale. A reported scale of exactly 0 is absent unless the
    /// type is time-like (where 0 fractional digits is meaningful).
    pub scale: Option<u32>,
}

impl DataType {
    /// A type with no size/precision parameters.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            size_unit: None,
            precision: None,
            scale: None,
        }
    }

    /// A character type with a declared size.
    pub fn sized(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size: Some(size),
            size_unit: None,
            precision: None,
            scale: None,
        }
    }

    /// A numeric type with precision and optional scale.
    pub fn numeric(name: impl Into<String>, precision: u32, scale: Option<u32>) -> Self {
        Self {
            name: name.into(),
            size: None,
            size_unit: None,
            precision: Some(precision),
            scale,
        }
    }

    pub fn with_unit(mut self, unit: SizeUnit) -> Self {
        self.size_unit = Some(unit);
        self
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if let Some(size) = self.size {
            match self.size_unit {
                Some(SizeUnit::Char) => write!(f, "({} char)", size)?,
                Some(SizeUnit::Byte) => write!(f, "({} byte)", size)?,
                None => write!(f, "({})", size)?,
            }
        } else if let Some(precision) = self.precision {
            match self.scale {
                Some(scale) => write!(f, "({}, {})", precision, scale)?,
                None => write!(f, "({})", precision)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain() {
        assert_eq!(DataType::plain("integer").to_string(), "integer");
    }

    #[test]
    fn test_display_sized() {
        assert_eq!(DataType::sized("varchar", 255).to_string(), "varchar(255)");
        assert_eq!(
            DataType::sized("varchar2", 30)
                .with_unit(SizeUnit::Char)
                .to_string(),
            "varchar2(30 char)"
        );
    }

    #[test]
    fn test_display_numeric() {
        assert_eq!(
            DataType::numeric("numeric", 10, Some(2)).to_string(),
            "numeric(10, 2)"
        );
        assert_eq!(DataType::numeric("number", 10, None).to_string(), "number(10)");
    }
}
