//! Live metadata provider implementations.
//!
//! One provider per supported driver stack. Each wraps an already-built
//! connection pool; pool construction, TLS and credentials stay with the
//! caller.

pub mod postgres;

pub use postgres::PgMetadataProvider;
