//! SQL Server dialect overrides.
//!
//! SQL Server has no RESTRICT referential action, wraps every default in
//! parentheses (`((0))`, `(getdate())`), prefixes unicode literals with
//! `N`, and (behind old drivers) reports FK rules in the legacy sp_fkeys
//! ordinal scheme rather than the standard codes.

use async_trait::async_trait;

use crate::error::Result;
use crate::meta::ColumnRow;
use crate::model::{DataType, DefaultValue, ReferentialAction, Sequence};
use crate::normalize;
use crate::registry::{
    generic, DefaultValueParser, GeneratorRegistry, ObjectKind, Priority, SnapshotGenerator,
};
use crate::snapshot::SnapshotContext;
use crate::vendor::{Engine, VendorId};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(MsForeignKeyGenerator);
    registry.register_generator(MsSequenceGenerator);
    registry.register_default_parser(MsDefaultParser);
}

fn ms_priority(vendor: &VendorId) -> Priority {
    if vendor.engine == Engine::Mssql {
        Priority::VENDOR
    } else {
        Priority::NONE
    }
}

/// FK assembly with SQL Server rule-code handling.
///
/// Picks the rule-code scheme the provider reports, then rewrites RESTRICT
/// to NO ACTION: the engine does not implement RESTRICT, so a reported
/// RESTRICT is the driver's spelling of the default action.
pub struct MsForeignKeyGenerator;

#[async_trait]
impl SnapshotGenerator for MsForeignKeyGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::ForeignKey
    }

    fn priority(&self, vendor: &VendorId) -> Priority {
        ms_priority(vendor)
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let map_rule = if ctx.provider().reports_sp_fkeys_rule_codes() {
            generic::referential_action_for_sp_fkeys_code
        } else {
            generic::referential_action_for_code
        };
        generic::scan_foreign_keys(ctx, map_rule).await?;

        for fk in &mut ctx.snapshot.foreign_keys {
            if fk.update_rule == ReferentialAction::Restrict {
                fk.update_rule = ReferentialAction::NoAction;
            }
            if fk.delete_rule == ReferentialAction::Restrict {
                fk.delete_rule = ReferentialAction::NoAction;
            }
        }
        Ok(())
    }
}

/// Strip SQL Server default-text wrapping: outer parens and the `N`
/// unicode-literal prefix.
fn strip_mssql_wrapping(text: &str) -> &str {
    let unwrapped = normalize::unwrap_parens(text);
    if let Some(rest) = unwrapped.strip_prefix('N') {
        if rest.starts_with('\'') && rest.ends_with('\'') {
            return rest;
        }
    }
    unwrapped
}

pub struct MsDefaultParser;

impl DefaultValueParser for MsDefaultParser {
    fn priority(&self, vendor: &VendorId) -> Priority {
        ms_priority(vendor)
    }

    fn parse(&self, row: &ColumnRow, data_type: &DataType) -> Option<DefaultValue> {
        if let Some(expr) = &row.generation_expression {
            return Some(DefaultValue::Function(expr.clone()));
        }
        let text = row.default_value.as_deref()?;
        normalize::classify_default(strip_mssql_wrapping(text), data_type)
    }
}

/// SQL Server sequence defaults: increment 1, no cycle, cache unreported.
fn suppress_mssql_sequence_defaults(seq: &mut Sequence) {
    if seq.increment_by == Some(1) {
        seq.increment_by = None;
    }
    if seq.cycle == Some(false) {
        seq.cycle = None;
    }
    if seq.min_value == Some(i64::MIN as i128) {
        seq.min_value = None;
    }
    if seq.max_value == Some(i64::MAX as i128) {
        seq.max_value = None;
    }
}

pub struct MsSequenceGenerator;

#[async_trait]
impl SnapshotGenerator for MsSequenceGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Sequence
    }

    fn priority(&self, vendor: &VendorId) -> Priority {
        ms_priority(vendor)
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        for schema in ctx.options.schemas.clone() {
            let rows = ctx.cache.sequences(catalog.as_deref(), &schema).await?;
            let mut sequences = generic::sequences_from_rows(&schema, rows);
            for seq in &mut sequences {
                suppress_mssql_sequence_defaults(seq);
            }
            ctx.snapshot.sequences.extend(sequences);
        }
        Ok(())
    }
}
