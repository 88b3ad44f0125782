//! # schemasnap
//!
//! Normalized in-memory snapshots of relational database schemas.
//!
//! A snapshot enumerates tables, views, columns, keys, constraints,
//! indexes and sequences over an already-open connection and reconciles
//! the vendor's raw metadata into one canonical object model:
//!
//! - **Fixed-phase orchestration** so cross-references always resolve
//! - **Adaptive metadata caching** that switches from per-table lookups to
//!   whole-schema bulk fetches under load
//! - **Priority-based dialect registry** where vendor overrides replace the
//!   generic extraction strategies
//! - **Type and default-value normalization** across Postgres, MySQL,
//!   SQL Server and Oracle
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use schemasnap::providers::PgMetadataProvider;
//! use schemasnap::snapshot::{SnapshotBuilder, SnapshotOptions};
//!
//! # async fn run(pool: deadpool_postgres::Pool) -> schemasnap::Result<()> {
//! let provider = PgMetadataProvider::from_pool(pool).detect_version().await?;
//! let builder = SnapshotBuilder::new();
//! let snapshot = builder
//!     .snapshot(Arc::new(provider), &SnapshotOptions::for_schema("public"))
//!     .await?;
//! println!("{} tables", snapshot.tables.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod meta;
pub mod model;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod snapshot;
pub mod vendor;

// Re-exports for convenient access
pub use config::SnapshotConfig;
pub use error::{Result, SnapshotError};
pub use meta::{MetadataCache, MetadataProvider};
pub use model::{Snapshot, SnapshotWarning};
pub use registry::{GeneratorRegistry, ObjectKind, Priority, SnapshotGenerator};
pub use snapshot::{ObjectFilter, SnapshotBuilder, SnapshotContext, SnapshotOptions};
pub use vendor::{Engine, VendorId};
