//! Oracle dialect overrides.
//!
//! Oracle folds everything into NUMBER, distinguishes BYTE and CHAR size
//! semantics on VARCHAR2, stores identity columns as system-generated
//! `ISEQ$$_...nextval` defaults, and pads sequence metadata with its
//! built-in defaults.

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

/// Oracle's default MAXVALUE for ascending sequences (28 nines).
const ORACLE_SEQUENCE_MAX: i128 = 9_999_999_999_999_999_999_999_999_999;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_type_translator(OraTypeTranslator);
    registry.register_default_parser(OraDefaultParser);
    registry.register_auto_increment_detector(OraAutoIncrementDetector);
    registry.register_generator(OraSequenceGenerator);
}

fn ora_priority(vendor: &VendorId) -> Priority {
    if vendor.engine == Engine::Oracle {
        Priority::VENDOR
    } else {
        Priority::NONE
    }
}

/// Whether a default is the system-generated reference to an identity
/// column's backing sequence.
fn is_identity_sequence_default(text: &str) -> bool {
    let t = text.trim().trim_matches('"');
    t.contains("ISEQ$$") && t.to_lowercase().contains("nextval")
}

pub struct OraTypeTranslator;

#[async_trait]
impl TypeTranslator for OraTypeTranslator {
    fn priority(&self, vendor: &VendorId) -> Priority {
        ora_priority(vendor)
    }

    async fn translate(
        &self,
        _schema: &str,
        row: &ColumnRow,
        _ctx: &mut SnapshotContext<'_>,
    ) -> Result<DataType> {
        let reported = row.type_name.trim().to_lowercase();

        // ANSI INTEGER is an alias for NUMBER(38).
        if reported == "integer" || reported == "int" {
            return Ok(DataType::numeric("number", 38, None));
        }

        if reported == "number" {
            return Ok(match row.precision {
                Some(p) if p > 0 => DataType::numeric(
                    "number",
                    p as u32,
                    row.scale.filter(|s| *s > 0).map(|s| s as u32),
                ),
                // Precision-less NUMBER is unbounded.
                _ => DataType::plain("number"),
            });
        }

        Ok(normalize::normalize_type(row))
    }
}

/// Oracle default parsing: identity-sequence defaults and the literal word
/// NULL (all_tab_columns reports it for explicitly-nullable columns) are
/// not user defaults.
pub struct OraDefaultParser;

impl DefaultValueParser for OraDefaultParser {
    fn priority(&self, vendor: &VendorId) -> Priority {
        ora_priority(vendor)
    }

    fn parse(&self, row: &ColumnRow, data_type: &DataType) -> Option<DefaultValue> {
        if let Some(expr) = &row.generation_expression {
            return Some(DefaultValue::Function(expr.clone()));
        }
        // Oracle pads DATA_DEFAULT with trailing whitespace.
        let text = row.default_value.as_deref()?.trim();
        if is_identity_sequence_default(text) {
            return None;
        }
        normalize::classify_default(text, data_type)
    }
}

/// Identity detection: the metadata flag, or the system-generated
/// `ISEQ$$` default on older catalogs that lack the flag.
pub struct OraAutoIncrementDetector;

#[async_trait]
impl AutoIncrementDetector for OraAutoIncrementDetector {
    fn priority(&self, vendor: &VendorId) -> Priority {
        ora_priority(vendor)
    }

    async fn detect(
        &self,
        _schema: &str,
        row: &ColumnRow,
        _ctx: &mut SnapshotContext<'_>,
    ) -> Result<Option<AutoIncrementInfo>> {
        if row.auto_increment == Some(true) {
            return Ok(Some(AutoIncrementInfo::default()));
        }
        if row
            .default_value
            .as_deref()
            .is_some_and(is_identity_sequence_default)
        {
            return Ok(Some(AutoIncrementInfo::default()));
        }
        Ok(None)
    }
}

/// Suppress Oracle sequence attributes matching CREATE SEQUENCE defaults.
fn suppress_oracle_sequence_defaults(seq: &mut Sequence) {
    if seq.start_value == Some(1) {
        seq.start_value = None;
    }
    if seq.increment_by == Some(1) {
        seq.increment_by = None;
    }
    if seq.min_value == Some(1) {
        seq.min_value = None;
    }
    if seq.max_value == Some(ORACLE_SEQUENCE_MAX) {
        seq.max_value = None;
    }
    if seq.cache_size == Some(20) {
        seq.cache_size = None;
    }
    if seq.cycle == Some(false) {
        seq.cycle = None;
    }
    if seq.ordered == Some(false) {
        seq.ordered = None;
    }
}

pub struct OraSequenceGenerator;

#[async_trait]
impl SnapshotGenerator for OraSequenceGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Sequence
    }

    fn priority(&self, vendor: &VendorId) -> Priority {
        ora_priority(vendor)
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        for schema in ctx.options.schemas.clone() {
            let rows = ctx.cache.sequences(catalog.as_deref(), &schema).await?;
            let mut sequences = generic::sequences_from_rows(&schema, rows);
            // Identity-backing sequences are system-generated and tracked
            // through their columns, not as standalone objects.
            sequences.retain(|s| !s.name.starts_with("ISEQ$$"));
            for seq in &mut sequences {
                suppress_oracle_sequence_defaults(seq);
            }
            ctx.snapshot.sequences.extend(sequences);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LiteralValue;

    fn ora_row(type_name: &str, default: Option<&str>) -> ColumnRow {
        ColumnRow {
            table: "EMPLOYEES".into(),
            name: "ID".into(),
            type_code: None,
            type_name: type_name.into(),
            size: None,
            precision: None,
            scale: None,
            size_unit_hint: None,
            nullable: false,
            default_value: default.map(String::from),
            remarks: None,
            auto_increment: None,
            generation_expression: None,
            ordinal: 1,
        }
    }

    #[test]
    fn test_identity_sequence_default_is_suppressed() {
        let parser = OraDefaultParser;
        let row = ora_row("NUMBER", Some("\"HR\".\"ISEQ$$_74583\".nextval"));
        assert_eq!(parser.parse(&row, &DataType::plain("number")), None);
    }

    #[test]
    fn test_word_null_default_is_no_default() {
        let parser = OraDefaultParser;
        let row = ora_row("VARCHAR2", Some("NULL "));
        assert_eq!(parser.parse(&row, &DataType::plain("varchar2")), None);
    }

    #[test]
    fn test_padded_literal_default() {
        let parser = OraDefaultParser;
        let row = ora_row("VARCHAR2", Some("'N' "));
        assert_eq!(
            parser.parse(&row, &DataType::sized("varchar2", 1)),
            Some(DefaultValue::Literal(LiteralValue::Text("N".into())))
        );
    }

    #[tokio::test]
    async fn test_identity_detected_from_sequence_default() {
        use std::sync::Arc;

        let detector = OraAutoIncrementDetector;
        let row = ora_row("NUMBER", Some("\"HR\".\"ISEQ$$_74583\".nextval"));
        let options = crate::snapshot::SnapshotOptions::for_schema("HR");
        let registry = Arc::new(GeneratorRegistry::new());
        let provider = Arc::new(crate::meta::provider::tests_support::NullProvider::new(
            VendorId::new(Engine::Oracle),
        ));
        let mut ctx = SnapshotContext::new(registry, provider, &options);
        let info = detector.detect("HR", &row, &mut ctx).await.unwrap();
        assert!(info.is_some());
    }

    #[tokio::test]
    async fn test_integer_maps_to_number_38() {
        use std::sync::Arc;

        let translator = OraTypeTranslator;
        let row = ora_row("INTEGER", None);
        let options = crate::snapshot::SnapshotOptions::for_schema("HR");
        let registry = Arc::new(GeneratorRegistry::new());
        let provider = Arc::new(crate::meta::provider::tests_support::NullProvider::new(
            VendorId::new(Engine::Oracle),
        ));
        let mut ctx = SnapshotContext::new(registry, provider, &options);
        let dt = translator.translate("HR", &row, &mut ctx).await.unwrap();
        assert_eq!(dt, DataType::numeric("number", 38, None));
    }

    #[test]
    fn test_sequence_default_suppression() {
        let mut seq = Sequence::new("HR", "EMP_SEQ");
        seq.start_value = Some(1);
        seq.increment_by = Some(1);
        seq.min_value = Some(1);
        seq.max_value = Some(ORACLE_SEQUENCE_MAX);
        seq.cache_size = Some(20);
        seq.cycle = Some(false);
        seq.ordered = Some(false);
        suppress_oracle_sequence_defaults(&mut seq);
        assert!(seq.start_value.is_none());
        assert!(seq.max_value.is_none());
        assert!(seq.cache_size.is_none());
        assert!(seq.ordered.is_none());

        let mut tuned = Sequence::new("HR", "ORDER_SEQ");
        tuned.cache_size = Some(1000);
        tuned.cycle = Some(true);
        suppress_oracle_sequence_defaults(&mut tuned);
        assert_eq!(tuned.cache_size, Some(1000));
        assert_eq!(tuned.cycle, Some(true));
    }
}
