//! Error types for schema snapshotting.

use thiserror::Error;

/// Main error type for snapshot operations.
///
/// Only connectivity-class failures abort a snapshot; everything else is
/// either recovered locally (and surfaced as a warning on the snapshot) or
/// reported before the scan starts (configuration errors).
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metadata query or connection failure. Fatal: aborts the snapshot.
    #[error("Metadata query failed: {message}\n  Context: {context}")]
    Connectivity { message: String, context: String },

    /// The database denied access to an object (e.g. a view definition).
    ///
    /// Providers raise this for permission-class failures so the
    /// orchestrator can substitute a sentinel instead of aborting.
    #[error("Permission denied reading {object}: {message}")]
    Permission { object: String, message: String },

    /// No dialect support registered for the active vendor.
    #[error("Unsupported database vendor: {0}")]
    UnsupportedVendor(String),

    /// IO error (config file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SnapshotError {
    /// Create a Connectivity error with context about where it occurred.
    pub fn connectivity(message: impl Into<String>, context: impl Into<String>) -> Self {
        SnapshotError::Connectivity {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Permission error for a named object.
    pub fn permission(object: impl Into<String>, message: impl Into<String>) -> Self {
        SnapshotError::Permission {
            object: object.into(),
            message: message.into(),
        }
    }

    /// True for failures that must abort the whole snapshot.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SnapshotError::Connectivity { .. } | SnapshotError::UnsupportedVendor(_)
        )
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, SnapshotError>;
