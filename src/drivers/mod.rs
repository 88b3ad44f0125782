//! Built-in vendor dialect overrides.
//!
//! Each module registers only the strategies where its vendor deviates
//! from the generic implementations; everything else falls through to
//! `crate::registry::generic`.

pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;

use crate::registry::GeneratorRegistry;

/// Register every built-in vendor override.
pub fn register_builtins(registry: &mut GeneratorRegistry) {
    postgres::register(registry);
    mysql::register(registry);
    mssql::register(registry);
    oracle::register(registry);
}
