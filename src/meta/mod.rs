//! Raw metadata access: the provider boundary and the per-snapshot cache.

pub mod cache;
pub mod provider;

pub use cache::{MetadataCache, BULK_FETCH_THRESHOLD};
pub use provider::{
    ColumnRow, ForeignKeyRow, IndexRow, MetadataProvider, PrimaryKeyRow, RelationRow, SequenceRow,
    SqlRow, UniqueConstraintRow,
};
