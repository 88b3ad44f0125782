//! Type and default-value normalization.
//!
//! Converts raw vendor (type-code, type-name, size, precision, scale,
//! unit-hint) tuples into canonical [`DataType`] descriptors, and parses
//! vendor default-value text into typed [`DefaultValue`]s. The rules here
//! are the vendor-agnostic common case; vendor-specific quirks (identity
//! sequence references, cast suffix dialects, enum definitions) layer on
//! top via registry overrides.

use crate::meta::ColumnRow;
use crate::model::{DataType, DefaultValue, LiteralValue, SizeUnit};

/// JDBC-style type code constants used by providers that report codes.
pub mod type_codes {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const BIGINT: i32 = -5;
    pub const LONGVARCHAR: i32 = -1;
    pub const CHAR: i32 = 1;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const INTEGER: i32 = 4;
    pub const SMALLINT: i32 = 5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const VARCHAR: i32 = 12;
    pub const BOOLEAN: i32 = 16;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const BLOB: i32 = 2004;
    pub const CLOB: i32 = 2005;
}

/// Canonical name for a JDBC-style type code, where one exists.
pub fn canonical_name_for_code(code: i32) -> Option<&'static str> {
    use type_codes::*;
    Some(match code {
        BIT => "bit",
        TINYINT => "tinyint",
        BIGINT => "bigint",
        LONGVARCHAR => "text",
        CHAR => "char",
        NUMERIC => "numeric",
        DECIMAL => "decimal",
        INTEGER => "integer",
        SMALLINT => "smallint",
        FLOAT => "float",
        REAL => "real",
        DOUBLE => "double precision",
        VARCHAR => "varchar",
        BOOLEAN => "boolean",
        DATE => "date",
        TIME => "time",
        TIMESTAMP => "timestamp",
        BLOB => "blob",
        CLOB => "clob",
        _ => return None,
    })
}

/// Types whose storage semantics are fixed by the vendor; they never carry
/// size or precision.
pub fn is_fixed_storage(name: &str) -> bool {
    matches!(
        name,
        "integer"
            | "int"
            | "int4"
            | "bigint"
            | "int8"
            | "smallint"
            | "int2"
            | "tinyint"
            | "boolean"
            | "bool"
            | "bit"
            | "real"
            | "float4"
            | "double precision"
            | "float8"
            | "date"
            | "text"
            | "clob"
            | "blob"
            | "bytea"
            | "uuid"
            | "json"
            | "jsonb"
            | "xml"
            | "money"
    )
}

/// Character/binary types that carry a declared size.
pub fn is_character(name: &str) -> bool {
    matches!(
        name,
        "char"
            | "nchar"
            | "varchar"
            | "nvarchar"
            | "varchar2"
            | "nvarchar2"
            | "character"
            | "character varying"
            | "bpchar"
            | "binary"
            | "varbinary"
            | "raw"
    )
}

/// Numeric types that carry precision/scale.
pub fn is_numeric(name: &str) -> bool {
    matches!(name, "numeric" | "decimal" | "dec" | "number" | "float")
}

/// Time-like types where a zero fractional-seconds scale is meaningful.
pub fn is_time_like(name: &str) -> bool {
    matches!(
        name,
        "time" | "timetz" | "timestamp" | "timestamptz" | "datetime2" | "datetimeoffset"
            | "interval"
    )
}

/// Normalize a raw column row into a canonical type descriptor.
///
/// The generic path: canonicalize the reported name (falling back to the
/// type code's standard name), then apply the storage-semantics rules for
/// which parameters the type carries.
pub fn normalize_type(row: &ColumnRow) -> DataType {
    let reported = row.type_name.trim().to_lowercase();
    let name = if reported.is_empty() {
        row.type_code
            .and_then(canonical_name_for_code)
            .unwrap_or("unknown")
            .to_string()
    } else {
        reported
    };
    build_type(&name, row.size, row.precision, row.scale, row.size_unit_hint.as_deref())
}

/// Build a descriptor from already-canonicalized parts.
pub fn build_type(
    name: &str,
    size: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
    unit_hint: Option<&str>,
) -> DataType {
    if is_fixed_storage(name) {
        return DataType::plain(name);
    }
    if is_character(name) {
        let mut dt = match size {
            Some(size) if size > 0 => DataType::sized(name, size as u32),
            _ => DataType::plain(name),
        };
        if dt.size.is_some() {
            dt.size_unit = parse_unit_hint(unit_hint);
        }
        return dt;
    }
    if is_numeric(name) {
        return match precision {
            Some(p) if p > 0 => {
                DataType::numeric(name, p as u32, normalize_scale(name, scale))
            }
            _ => DataType::plain(name),
        };
    }
    if is_time_like(name) {
        let mut dt = DataType::plain(name);
        // Fractional-seconds precision; zero is meaningful here.
        dt.scale = scale.filter(|s| *s >= 0).map(|s| s as u32);
        return dt;
    }
    // Unrecognized vendor type: keep the name, drop the parameters.
    DataType::plain(name)
}

/// Apply the scale-of-zero rule: absent unless the type is time-like.
fn normalize_scale(name: &str, scale: Option<i32>) -> Option<u32> {
    match scale {
        Some(0) if !is_time_like(name) => None,
        Some(s) if s >= 0 => Some(s as u32),
        _ => None,
    }
}

fn parse_unit_hint(hint: Option<&str>) -> Option<SizeUnit> {
    match hint.map(|h| h.trim().to_uppercase()) {
        Some(h) if h == "C" || h == "CHAR" => Some(SizeUnit::Char),
        Some(h) if h == "B" || h == "BYTE" => Some(SizeUnit::Byte),
        _ => None,
    }
}

/// Strip a trailing cast suffix (`'x'::character varying` → `'x'`).
///
/// Applied repeatedly: some vendors stack casts.
pub fn strip_cast_suffix(text: &str) -> &str {
    let mut out = text.trim();
    while let Some(pos) = out.rfind("::") {
        // Only strip when what follows looks like a type name, not an
        // operator buried inside a quoted literal.
        let suffix = &out[pos + 2..];
        let looks_like_type = !suffix.is_empty()
            && suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ' || c == '(' || c == ')');
        let in_quotes = out[..pos].matches('\'').count() % 2 == 1;
        if looks_like_type && !in_quotes {
            out = out[..pos].trim();
        } else {
            break;
        }
    }
    out
}

/// Unwrap redundant outer parentheses (`((0))` → `0`).
pub fn unwrap_parens(text: &str) -> &str {
    let mut out = text.trim();
    while out.len() >= 2 && out.starts_with('(') && out.ends_with(')') {
        let inner = out[1..out.len() - 1].trim();
        // Only unwrap when the parens are balanced around the whole text.
        let mut depth = 0i32;
        let mut balanced = true;
        for c in inner.chars() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        balanced = false;
                        break;
                    }
                }
                _ => {}
            }
        }
        if balanced && depth == 0 {
            out = inner;
        } else {
            break;
        }
    }
    out
}

/// Unquote a single-quoted SQL string literal, unescaping doubled quotes.
pub fn unquote_string(text: &str) -> Option<String> {
    let t = text.trim();
    if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'') {
        let inner = &t[1..t.len() - 1];
        // A lone quote in the middle means this is not a single literal.
        let unescaped = inner.replace("''", "\u{0}");
        if unescaped.contains('\'') {
            return None;
        }
        return Some(unescaped.replace('\u{0}', "'"));
    }
    None
}

/// Whether text is a bare identifier (letters, digits, `_`, `$`).
pub fn is_bare_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Detect common sequence-next-value spellings.
///
/// Handles `nextval('name')`, `NEXT VALUE FOR name`, and `name.nextval`.
pub fn parse_sequence_ref(text: &str) -> Option<String> {
    let t = text.trim();
    // ASCII folding keeps byte offsets aligned with the original text, so
    // the keyword match can slice `t` and preserve the name's case.
    let lower = t.to_ascii_lowercase();

    if lower.starts_with("nextval(") {
        if !lower.ends_with(')') {
            return None;
        }
        let inner = strip_cast_suffix(&t["nextval(".len()..t.len() - 1]);
        let name = unquote_string(inner).unwrap_or_else(|| inner.trim().to_string());
        let name = name.trim_matches('"');
        if !name.is_empty() {
            return Some(name.to_string());
        }
        return None;
    }

    if let Some(idx) = lower.find("next value for ") {
        if idx == 0 {
            let name = t["next value for ".len()..].trim();
            if !name.is_empty() {
                return Some(name.trim_matches(|c| c == '[' || c == ']' || c == '"').to_string());
            }
        }
        return None;
    }

    if lower.ends_with(".nextval") && t.len() > ".nextval".len() {
        let prefix = &t[..t.len() - ".nextval".len()];
        if is_bare_identifier(prefix.trim_matches('"')) {
            return Some(prefix.trim_matches('"').to_string());
        }
    }

    None
}

/// Classify normalized default text against a column's canonical type.
///
/// `None` means "no default". Unclassifiable text falls back to an opaque
/// string literal rather than an error.
pub fn classify_default(text: &str, data_type: &DataType) -> Option<DefaultValue> {
    let stripped = unwrap_parens(strip_cast_suffix(text));
    if stripped.is_empty() {
        return None;
    }

    if stripped.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Some(seq) = parse_sequence_ref(stripped) {
        return Some(DefaultValue::SequenceRef(seq));
    }

    if let Some(s) = unquote_string(stripped) {
        return Some(DefaultValue::Literal(typed_literal(&s, data_type)));
    }

    if stripped.eq_ignore_ascii_case("true") {
        return Some(DefaultValue::Literal(LiteralValue::Bool(true)));
    }
    if stripped.eq_ignore_ascii_case("false") {
        return Some(DefaultValue::Literal(LiteralValue::Bool(false)));
    }

    if let Ok(i) = stripped.parse::<i64>() {
        if is_boolean_type(&data_type.name) {
            return Some(DefaultValue::Literal(LiteralValue::Bool(i != 0)));
        }
        return Some(DefaultValue::Literal(LiteralValue::Int(i)));
    }
    if let Ok(f) = stripped.parse::<f64>() {
        return Some(DefaultValue::Literal(LiteralValue::Float(f)));
    }

    // A bare identifier is a niladic function reference; uppercase it the
    // way vendors canonicalize keywords (CURRENT_TIMESTAMP and friends).
    if is_bare_identifier(stripped) {
        return Some(DefaultValue::Function(stripped.to_uppercase()));
    }

    // Any parenthesized or multi-token expression is a function call,
    // kept verbatim.
    if stripped.contains('(') || stripped.contains(' ') {
        return Some(DefaultValue::Function(stripped.to_string()));
    }

    // Ill-formed text: keep it as an opaque literal.
    Some(DefaultValue::Literal(LiteralValue::Text(
        stripped.to_string(),
    )))
}

fn is_boolean_type(name: &str) -> bool {
    matches!(name, "boolean" | "bool" | "bit")
}

fn typed_literal(text: &str, data_type: &DataType) -> LiteralValue {
    let name = data_type.name.as_str();
    if is_boolean_type(name) {
        match text {
            "1" | "t" | "true" | "TRUE" => return LiteralValue::Bool(true),
            "0" | "f" | "false" | "FALSE" => return LiteralValue::Bool(false),
            _ => {}
        }
    }
    let numeric_ish = is_numeric(name)
        || matches!(
            name,
            "integer" | "int" | "int4" | "bigint" | "int8" | "smallint" | "int2" | "tinyint"
                | "real" | "float4" | "double precision" | "float8"
        );
    if numeric_ish {
        if let Ok(i) = text.trim().parse::<i64>() {
            return LiteralValue::Int(i);
        }
        if let Ok(f) = text.trim().parse::<f64>() {
            return LiteralValue::Float(f);
        }
    }
    LiteralValue::Text(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_row(type_name: &str) -> ColumnRow {
        ColumnRow {
            table: "t".to_string(),
            name: "c".to_string(),
            type_code: None,
            type_name: type_name.to_string(),
            size: None,
            precision: None,
            scale: None,
            size_unit_hint: None,
            nullable: true,
            default_value: None,
            remarks: None,
            auto_increment: None,
            generation_expression: None,
            ordinal: 1,
        }
    }

    #[test]
    fn test_fixed_storage_drops_parameters() {
        let mut row = column_row("integer");
        row.size = Some(10);
        row.precision = Some(32);
        let dt = normalize_type(&row);
        assert_eq!(dt, DataType::plain("integer"));
    }

    #[test]
    fn test_character_carries_size_and_unit() {
        let mut row = column_row("varchar");
        row.size = Some(255);
        row.size_unit_hint = Some("CHAR".to_string());
        let dt = normalize_type(&row);
        assert_eq!(dt.size, Some(255));
        assert_eq!(dt.size_unit, Some(SizeUnit::Char));
    }

    #[test]
    fn test_numeric_scale_zero_is_absent() {
        let dt = build_type("numeric", None, Some(10), Some(0), None);
        assert_eq!(dt.precision, Some(10));
        assert_eq!(dt.scale, None);

        let dt = build_type("numeric", None, Some(10), Some(2), None);
        assert_eq!(dt.scale, Some(2));
    }

    #[test]
    fn test_time_like_zero_scale_is_kept() {
        let dt = build_type("timestamp", None, None, Some(0), None);
        assert_eq!(dt.scale, Some(0));
    }

    #[test]
    fn test_type_code_fallback() {
        let mut row = column_row("");
        row.type_code = Some(type_codes::BIGINT);
        assert_eq!(normalize_type(&row).name, "bigint");
    }

    #[test]
    fn test_strip_cast_suffix() {
        assert_eq!(strip_cast_suffix("'abc'::character varying"), "'abc'");
        assert_eq!(strip_cast_suffix("0::smallint::integer"), "0");
        // A :: inside a string literal stays put.
        assert_eq!(strip_cast_suffix("'a::b'"), "'a::b'");
    }

    #[test]
    fn test_unwrap_parens() {
        assert_eq!(unwrap_parens("((0))"), "0");
        assert_eq!(unwrap_parens("(getdate())"), "getdate()");
        // Unbalanced interior parens are left alone.
        assert_eq!(unwrap_parens("(a) + (b)"), "(a) + (b)");
    }

    #[test]
    fn test_unquote_string() {
        assert_eq!(unquote_string("'hello'"), Some("hello".to_string()));
        assert_eq!(unquote_string("'O''Brien'"), Some("O'Brien".to_string()));
        assert_eq!(unquote_string("42"), None);
    }

    #[test]
    fn test_sequence_ref_spellings() {
        assert_eq!(
            parse_sequence_ref("nextval('orders_id_seq'::regclass)"),
            Some("orders_id_seq".to_string())
        );
        assert_eq!(
            parse_sequence_ref("NEXT VALUE FOR dbo.order_seq"),
            Some("dbo.order_seq".to_string())
        );
        assert_eq!(
            parse_sequence_ref("ORDER_SEQ.nextval"),
            Some("ORDER_SEQ".to_string())
        );
        assert_eq!(parse_sequence_ref("now()"), None);
    }

    #[test]
    fn test_sequence_ref_preserves_quoted_name_case() {
        // A quoted Postgres sequence name is case-sensitive; the extracted
        // name must keep its spelling, with the identifier quotes removed.
        assert_eq!(
            parse_sequence_ref("nextval('\"Order_Seq\"'::regclass)"),
            Some("Order_Seq".to_string())
        );
        assert_eq!(
            parse_sequence_ref("NEXTVAL('Mixed_Seq')"),
            Some("Mixed_Seq".to_string())
        );
        assert_eq!(parse_sequence_ref("nextval('broken"), None);
    }

    #[test]
    fn test_classify_literals() {
        let int_type = DataType::plain("integer");
        assert_eq!(
            classify_default("42", &int_type),
            Some(DefaultValue::Literal(LiteralValue::Int(42)))
        );
        let text_type = DataType::sized("varchar", 10);
        assert_eq!(
            classify_default("'abc'::text", &text_type),
            Some(DefaultValue::Literal(LiteralValue::Text("abc".to_string())))
        );
        let bool_type = DataType::plain("boolean");
        assert_eq!(
            classify_default("1", &bool_type),
            Some(DefaultValue::Literal(LiteralValue::Bool(true)))
        );
    }

    #[test]
    fn test_classify_functions() {
        let ts = DataType::plain("timestamp");
        assert_eq!(
            classify_default("current_timestamp", &ts),
            Some(DefaultValue::Function("CURRENT_TIMESTAMP".to_string()))
        );
        assert_eq!(
            classify_default("(getdate())", &ts),
            Some(DefaultValue::Function("getdate()".to_string()))
        );
    }

    #[test]
    fn test_classify_null_and_empty() {
        let t = DataType::plain("integer");
        assert_eq!(classify_default("NULL", &t), None);
        assert_eq!(classify_default("  ", &t), None);
    }

    #[test]
    fn test_classify_sequence_ref() {
        let t = DataType::plain("bigint");
        assert_eq!(
            classify_default("nextval('s1')", &t),
            Some(DefaultValue::SequenceRef("s1".to_string()))
        );
    }

    #[test]
    fn test_ill_formed_falls_back_to_opaque_literal() {
        let t = DataType::plain("integer");
        assert_eq!(
            classify_default("@@weird", &t),
            Some(DefaultValue::Literal(LiteralValue::Text("@@weird".to_string())))
        );
    }
}
