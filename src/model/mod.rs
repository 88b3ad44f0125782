//! The schema object model.
//!
//! Plain data entities describing one database schema: tables, views,
//! columns, keys, constraints, indexes and sequences, assembled into a
//! [`Snapshot`] graph. Entities carry name-based identity, structural
//! equality and a deterministic total ordering; behavior beyond invariant
//! enforcement lives in the orchestrator.

pub mod column;
pub mod constraint;
pub mod name;
pub mod relation;
pub mod sequence;
pub mod snapshot;
pub mod types;

pub use column::{AutoIncrementInfo, Column, DefaultValue, LiteralValue};
pub use constraint::{
    AssociatedWith, ForeignKey, Index, PrimaryKey, ReferentialAction, UniqueConstraint,
};
pub use name::NameMatcher;
pub use relation::{RelationKind, RelationRef, Table, View, VIEW_DEFINITION_UNAVAILABLE};
pub use sequence::Sequence;
pub use snapshot::{Snapshot, SnapshotWarning};
pub use types::{DataType, SizeUnit};
