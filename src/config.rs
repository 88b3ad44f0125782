//! Snapshot configuration.
//!
//! YAML-backed configuration for callers that drive snapshots from files.
//! Programmatic callers can build [`SnapshotOptions`] directly and skip
//! this layer.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SnapshotError};
use crate::snapshot::{ObjectFilter, SnapshotOptions};

fn default_exclude_tables() -> Vec<String> {
    vec![
        "schemasnap_changelog".to_string(),
        "schemasnap_changelog_lock".to_string(),
    ]
}

fn default_bulk_threshold() -> usize {
    crate::meta::BULK_FETCH_THRESHOLD
}

/// File-backed snapshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Catalog to scope the scan to, where the vendor has catalogs.
    #[serde(default)]
    pub catalog: Option<String>,

    /// Schemas to scan. Must not be empty.
    pub schemas: Vec<String>,

    /// Tables excluded by name, defaulting to the change-tracking ledger.
    #[serde(default = "default_exclude_tables")]
    pub exclude_tables: Vec<String>,

    /// Object kinds to include. All kinds by default.
    #[serde(default)]
    pub filter: ObjectFilter,

    /// Single lookups per (kind, schema) before switching to bulk fetches.
    #[serde(default = "default_bulk_threshold")]
    pub bulk_threshold: usize,
}

impl SnapshotConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "loaded snapshot configuration");
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.schemas.is_empty() {
            return Err(SnapshotError::Config(
                "schemas must name at least one schema".to_string(),
            ));
        }
        if self.schemas.iter().any(|s| s.trim().is_empty()) {
            return Err(SnapshotError::Config(
                "schema names must not be blank".to_string(),
            ));
        }
        if self.bulk_threshold == 0 {
            return Err(SnapshotError::Config(
                "bulk_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert into the options the snapshot builder consumes.
    pub fn to_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            catalog: self.catalog.clone(),
            schemas: self.schemas.clone(),
            exclude_tables: self.exclude_tables.clone(),
            filter: self.filter,
            bulk_threshold: self.bulk_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml() {
        let config = SnapshotConfig::from_yaml("schemas: [public]").unwrap();
        assert_eq!(config.schemas, vec!["public"]);
        assert_eq!(config.bulk_threshold, 3);
        assert!(config
            .exclude_tables
            .iter()
            .any(|t| t == "schemasnap_changelog"));
        assert!(config.filter.tables);
        assert!(config.filter.sequences);
    }

    #[test]
    fn test_filter_section() {
        let yaml = r#"
schemas: [public, audit]
filter:
  indexes: false
  sequences: false
bulk_threshold: 10
"#;
        let config = SnapshotConfig::from_yaml(yaml).unwrap();
        assert!(!config.filter.indexes);
        assert!(!config.filter.sequences);
        assert!(config.filter.tables);
        assert_eq!(config.bulk_threshold, 10);

        let options = config.to_options();
        assert_eq!(options.schemas, vec!["public", "audit"]);
        assert_eq!(options.bulk_threshold, 10);
    }

    #[test]
    fn test_empty_schemas_rejected() {
        assert!(SnapshotConfig::from_yaml("schemas: []").is_err());
        assert!(SnapshotConfig::from_yaml("schemas: ['  ']").is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let yaml = "schemas: [public]\nbulk_threshold: 0";
        assert!(SnapshotConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "schemas: [public]\nunknown_key: true";
        assert!(SnapshotConfig::from_yaml(yaml).is_err());
    }
}
