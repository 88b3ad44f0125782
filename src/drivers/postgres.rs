//! PostgreSQL dialect overrides.
//!
//! Postgres reports internal type names (`int4`, `_text`), implements
//! serial columns as `nextval()` defaults on plain integers, and pads
//! sequence metadata with its built-in defaults. The overrides here undo
//! each of those before the generic model sees them.

use async_trait::async_trait;

use crate::error::Result;
use crate::meta::ColumnRow;
use crate::model::{AutoIncrementInfo, DataType, DefaultValue, Sequence};
use crate::normalize;
use crate::registry::{
    generic, AutoIncrementDetector, DefaultValueParser, GeneratorRegistry, ObjectKind, Priority,
    SnapshotGenerator, TypeTranslator,
};
use crate::snapshot::SnapshotContext;
use crate::vendor::{Engine, VendorId};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_type_translator(PgTypeTranslator);
    registry.register_default_parser(PgDefaultParser);
    registry.register_auto_increment_detector(PgAutoIncrementDetector);
    registry.register_generator(PgSequenceGenerator);
}

fn pg_priority(vendor: &VendorId) -> Priority {
    if vendor.engine == Engine::Postgres {
        Priority::VENDOR
    } else {
        Priority::NONE
    }
}

/// Canonical spelling for a Postgres internal type name.
fn canonical_pg_name(name: &str) -> &str {
    match name {
        "int4" => "integer",
        "int8" => "bigint",
        "int2" => "smallint",
        "serial" => "integer",
        "bigserial" => "bigint",
        "smallserial" => "smallint",
        "float4" => "real",
        "float8" => "double precision",
        "bool" => "boolean",
        "bpchar" => "char",
        "character varying" => "varchar",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "time without time zone" => "time",
        "time with time zone" => "timetz",
        other => other,
    }
}

/// Does a canonical type name denote an integer family member.
fn is_integer_family(name: &str) -> bool {
    matches!(name, "integer" | "bigint" | "smallint")
}

pub struct PgTypeTranslator;

#[async_trait]
impl TypeTranslator for PgTypeTranslator {
    fn priority(&self, vendor: &VendorId) -> Priority {
        pg_priority(vendor)
    }

    async fn translate(
        &self,
        _schema: &str,
        row: &ColumnRow,
        _ctx: &mut SnapshotContext<'_>,
    ) -> Result<DataType> {
        let reported = row.type_name.trim().to_lowercase();

        // Internal array spelling: leading underscore on the element type.
        if let Some(element) = reported.strip_prefix('_') {
            let element = canonical_pg_name(element);
            return Ok(DataType::plain(format!("{}[]", element)));
        }

        let name = canonical_pg_name(&reported);
        Ok(normalize::build_type(
            name,
            row.size,
            row.precision,
            row.scale,
            row.size_unit_hint.as_deref(),
        ))
    }
}

/// Postgres default parsing.
///
/// Serial columns carry their implementing `nextval()` call as the column
/// default; that is the identity mechanism, not a user default, so it is
/// suppressed whenever the column is auto-increment.
pub struct PgDefaultParser;

impl DefaultValueParser for PgDefaultParser {
    fn priority(&self, vendor: &VendorId) -> Priority {
        pg_priority(vendor)
    }

    fn parse(&self, row: &ColumnRow, data_type: &DataType) -> Option<DefaultValue> {
        if let Some(expr) = &row.generation_expression {
            return Some(DefaultValue::Function(expr.clone()));
        }
        let text = row.default_value.as_deref()?;
        let parsed = normalize::classify_default(text, data_type)?;
        if row.auto_increment == Some(true) {
            if let DefaultValue::SequenceRef(_) = parsed {
                return None;
            }
        }
        Some(parsed)
    }
}

/// Serial detection: the identity flag, or an integer column whose default
/// is a sequence reference (pre-identity serial columns).
pub struct PgAutoIncrementDetector;

#[async_trait]
impl AutoIncrementDetector for PgAutoIncrementDetector {
    fn priority(&self, vendor: &VendorId) -> Priority {
        pg_priority(vendor)
    }

    async fn detect(
        &self,
        _schema: &str,
        row: &ColumnRow,
        _ctx: &mut SnapshotContext<'_>,
    ) -> Result<Option<AutoIncrementInfo>> {
        let sequence_name = row
            .default_value
            .as_deref()
            .and_then(normalize::parse_sequence_ref);

        if row.auto_increment == Some(true) {
            return Ok(Some(AutoIncrementInfo {
                sequence_name,
                ..Default::default()
            }));
        }

        let reported = row.type_name.trim().to_lowercase();
        let name = canonical_pg_name(&reported);
        if is_integer_family(name) {
            if let Some(sequence_name) = sequence_name {
                return Ok(Some(AutoIncrementInfo {
                    sequence_name: Some(sequence_name),
                    ..Default::default()
                }));
            }
        }
        Ok(None)
    }
}

/// Suppress Postgres sequence attributes that match the built-in defaults,
/// so generated change-logs stay minimal.
fn suppress_pg_sequence_defaults(seq: &mut Sequence) {
    if seq.start_value == Some(1) {
        seq.start_value = None;
    }
    if seq.increment_by == Some(1) {
        seq.increment_by = None;
    }
    if seq.min_value == Some(1) {
        seq.min_value = None;
    }
    if seq.max_value == Some(i64::MAX as i128) || seq.max_value == Some(i32::MAX as i128) {
        seq.max_value = None;
    }
    if seq.cache_size == Some(1) {
        seq.cache_size = None;
    }
    if seq.cycle == Some(false) {
        seq.cycle = None;
    }
}

pub struct PgSequenceGenerator;

#[async_trait]
impl SnapshotGenerator for PgSequenceGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Sequence
    }

    fn priority(&self, vendor: &VendorId) -> Priority {
        pg_priority(vendor)
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        for schema in ctx.options.schemas.clone() {
            let rows = ctx.cache.sequences(catalog.as_deref(), &schema).await?;
            let mut sequences = generic::sequences_from_rows(&schema, rows);
            for seq in &mut sequences {
                suppress_pg_sequence_defaults(seq);
            }
            ctx.snapshot.sequences.extend(sequences);
        }
        Ok(())
    }
}
