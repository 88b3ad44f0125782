//! MySQL / MariaDB dialect overrides.
//!
//! MySQL's `information_schema.columns` reports enum and set columns with a
//! bare `enum`/`set` type name; the full value list only exists in the
//! `column_type` column. The translator here fetches it with one secondary
//! query per table, memoized on the snapshot context. Defaults need care
//! too: MySQL reports literal defaults unquoted, so `classify_default`'s
//! quote-driven rules cannot tell `'abc'` from a function name.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::meta::ColumnRow;
use crate::model::{DataType, DefaultValue, LiteralValue};
use crate::normalize;
use crate::registry::{
    DefaultValueParser, GeneratorRegistry, Priority, TypeTranslator,
};
use crate::snapshot::SnapshotContext;
use crate::vendor::{Engine, VendorId};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_type_translator(MyTypeTranslator);
    registry.register_default_parser(MyDefaultParser);
}

fn my_priority(vendor: &VendorId) -> Priority {
    if vendor.engine == Engine::Mysql {
        Priority::VENDOR
    } else {
        Priority::NONE
    }
}

/// Escape a string for inlining into a secondary query literal.
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub struct MyTypeTranslator;

impl MyTypeTranslator {
    /// Resolve the full declared type (`enum('a','b')`) for one column,
    /// using the per-table memoized secondary lookup.
    async fn declared_column_type(
        &self,
        schema: &str,
        row: &ColumnRow,
        ctx: &mut SnapshotContext<'_>,
    ) -> Result<Option<String>> {
        let key = format!("mysql_column_type:{}.{}", schema, row.table);
        let sql = format!(
            "SELECT column_name, column_type FROM information_schema.columns \
             WHERE table_schema = {} AND table_name = {}",
            quote_literal(schema),
            quote_literal(&row.table),
        );
        let rows = ctx.cached_query(&key, &sql).await?;
        let matcher = ctx.matcher();
        for sql_row in rows.iter() {
            if sql_row
                .get("column_name")
                .is_some_and(|n| matcher.eq(n, &row.name))
            {
                return Ok(sql_row.get("column_type").map(str::to_string));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl TypeTranslator for MyTypeTranslator {
    fn priority(&self, vendor: &VendorId) -> Priority {
        my_priority(vendor)
    }

    async fn translate(
        &self,
        schema: &str,
        row: &ColumnRow,
        ctx: &mut SnapshotContext<'_>,
    ) -> Result<DataType> {
        let reported = row.type_name.trim().to_lowercase();

        // tinyint(1) is MySQL's boolean spelling.
        if reported == "tinyint" && row.size == Some(1) {
            return Ok(DataType::plain("boolean"));
        }

        if reported == "enum" || reported == "set" {
            if let Some(declared) = self.declared_column_type(schema, row, ctx).await? {
                return Ok(DataType::plain(declared));
            }
            debug!(table = %row.table, column = %row.name, "declared enum type not found");
            return Ok(DataType::plain(reported));
        }

        Ok(normalize::normalize_type(row))
    }
}

/// MySQL reports defaults unquoted; a non-numeric default on a character
/// column is a literal unless it is one of the known niladic functions.
pub struct MyDefaultParser;

fn is_niladic_function(text: &str) -> bool {
    let t = text.trim().trim_end_matches("()");
    t.eq_ignore_ascii_case("current_timestamp")
        || t.eq_ignore_ascii_case("now")
        || t.eq_ignore_ascii_case("current_date")
        || t.eq_ignore_ascii_case("current_time")
        || t.eq_ignore_ascii_case("localtime")
        || t.eq_ignore_ascii_case("localtimestamp")
        || t.eq_ignore_ascii_case("uuid")
}

impl DefaultValueParser for MyDefaultParser {
    fn priority(&self, vendor: &VendorId) -> Priority {
        my_priority(vendor)
    }

    fn parse(&self, row: &ColumnRow, data_type: &DataType) -> Option<DefaultValue> {
        if let Some(expr) = &row.generation_expression {
            return Some(DefaultValue::Function(expr.clone()));
        }
        let text = row.default_value.as_deref()?.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("null") {
            return None;
        }
        if is_niladic_function(text) {
            return Some(DefaultValue::Function(text.to_uppercase()));
        }
        let name = data_type.name.as_str();
        let character_like = normalize::is_character(name)
            || name == "text"
            || name.starts_with("enum")
            || name.starts_with("set");
        if character_like && normalize::unquote_string(text).is_none() {
            // Unquoted literal text, reported as-is by information_schema.
            return Some(DefaultValue::Literal(LiteralValue::Text(text.to_string())));
        }
        normalize::classify_default(text, data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn my_row(type_name: &str, default: Option<&str>) -> ColumnRow {
        ColumnRow {
            table: "t".into(),
            name: "c".into(),
            type_code: None,
            type_name: type_name.into(),
            size: None,
            precision: None,
            scale: None,
            size_unit_hint: None,
            nullable: true,
            default_value: default.map(String::from),
            remarks: None,
            auto_increment: None,
            generation_expression: None,
            ordinal: 1,
        }
    }

    #[test]
    fn test_unquoted_text_default_is_literal() {
        let parser = MyDefaultParser;
        let row = my_row("varchar", Some("pending"));
        assert_eq!(
            parser.parse(&row, &DataType::sized("varchar", 20)),
            Some(DefaultValue::Literal(LiteralValue::Text("pending".into())))
        );
    }

    #[test]
    fn test_current_timestamp_is_function() {
        let parser = MyDefaultParser;
        let row = my_row("timestamp", Some("CURRENT_TIMESTAMP"));
        assert_eq!(
            parser.parse(&row, &DataType::plain("timestamp")),
            Some(DefaultValue::Function("CURRENT_TIMESTAMP".into()))
        );
    }

    #[test]
    fn test_numeric_default_stays_typed() {
        let parser = MyDefaultParser;
        let row = my_row("int", Some("0"));
        assert_eq!(
            parser.parse(&row, &DataType::plain("integer")),
            Some(DefaultValue::Literal(LiteralValue::Int(0)))
        );
    }

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }

    #[tokio::test]
    async fn test_tinyint1_is_boolean() {
        use std::sync::Arc;

        let translator = MyTypeTranslator;
        let mut row = my_row("tinyint", None);
        row.size = Some(1);
        let options = crate::snapshot::SnapshotOptions::for_schema("shop");
        let registry = Arc::new(GeneratorRegistry::new());
        let provider = Arc::new(crate::meta::provider::tests_support::NullProvider::new(
            VendorId::new(Engine::Mysql),
        ));
        let mut ctx = SnapshotContext::new(registry, provider, &options);
        let dt = translator.translate("shop", &row, &mut ctx).await.unwrap();
        assert_eq!(dt, DataType::plain("boolean"));
    }
}
