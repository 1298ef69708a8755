//! JSON / logfmt / custom structured rendering.

use crate::level::{Level, LevelFormat, Metadata, StructuredField};

use super::template::{render_timestamp, TimestampFormat};

/// Which machine-readable rendering a formatter produces.
#[derive(Debug, Clone)]
pub enum StructuredFormat {
    Json,
    Logfmt,
    Custom {
        field_separator: String,
        key_value_separator: String,
    },
}

impl Default for StructuredFormat {
    fn default() -> Self {
        StructuredFormat::Json
    }
}

fn resolve_timestamp(metadata: Option<&Metadata>) -> i64 {
    metadata
        .and_then(|m| m.timestamp)
        .unwrap_or_else(|| chrono::Utc::now().timestamp())
}

/// Quote a logfmt/custom value if it contains a space, quote, `=`, or
/// newline, escaping `"` and `\` inside the quotes.
fn quote_if_needed(value: &str) -> String {
    let needs_quoting = value
        .chars()
        .any(|c| c == ' ' || c == '"' || c == '=' || c == '\n');
    if !needs_quoting {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a structured record as JSON.
///
/// Interior `"` and `\` in string values are **not**
/// escaped — a deliberate behavior change to preserve, not a bug.
pub fn render_json(
    level: Level,
    level_format: LevelFormat,
    message: &str,
    fields: &[StructuredField],
    metadata: Option<&Metadata>,
    timestamp_format: &TimestampFormat,
    include_timestamp: bool,
    include_level: bool,
    include_message: bool,
) -> String {
    let mut out = String::from("{");
    let mut first = true;

    let mut push_raw_key_value = |out: &mut String, first: &mut bool, key: &str, value_json: &str| {
        if !*first {
            out.push(',');
        }
        *first = false;
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        out.push_str(value_json);
    };

    if include_timestamp {
        let ts = render_timestamp(resolve_timestamp(metadata), timestamp_format);
        push_raw_key_value(&mut out, &mut first, "timestamp", &format!("\"{}\"", ts));
    }
    if include_level {
        push_raw_key_value(
            &mut out,
            &mut first,
            "level",
            &format!("\"{}\"", level.render(level_format)),
        );
    }
    if include_message {
        push_raw_key_value(&mut out, &mut first, "msg", &format!("\"{}\"", message));
    }

    for field in fields {
        let value_json = field_value_to_raw_json(&field.value);
        push_raw_key_value(&mut out, &mut first, &field.name, &value_json);
        for (attr_key, attr_value) in &field.attributes {
            let key = format!("{}_{}", field.name, attr_key);
            push_raw_key_value(&mut out, &mut first, &key, &format!("\"{}\"", attr_value));
        }
    }

    out.push('}');
    out
}

/// Convert a field's value to JSON text without escaping embedded quotes in
/// strings, matching the baseline non-escaping behavior.
fn field_value_to_raw_json(value: &crate::level::FieldValue) -> String {
    use crate::level::FieldValue;
    match value {
        FieldValue::String(s) => format!("\"{}\"", s),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Null => "null".to_string(),
        FieldValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(field_value_to_raw_json).collect();
            format!("[{}]", parts.join(","))
        }
        FieldValue::Object(pairs) => {
            let parts: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("\"{}\":{}", k, field_value_to_raw_json(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Render a structured record as `key=value` pairs separated by single
/// spaces (logfmt) or by a configured separator/kv-separator (custom).
pub fn render_delimited(
    message: &str,
    fields: &[StructuredField],
    field_separator: &str,
    key_value_separator: &str,
    include_message: bool,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(fields.len() + 1);
    if include_message {
        parts.push(format!("msg{}{}", key_value_separator, quote_if_needed(message)));
    }
    for field in fields {
        parts.push(format!(
            "{}{}{}",
            field.name,
            key_value_separator,
            quote_if_needed(&field.value.to_plain_string())
        ));
        for (attr_key, attr_value) in &field.attributes {
            parts.push(format!(
                "{}_{}{}{}",
                field.name,
                attr_key,
                key_value_separator,
                quote_if_needed(attr_value)
            ));
        }
    }
    parts.join(field_separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::FieldValue;

    #[test]
    fn json_scenario_from_spec() {
        let fields = vec![StructuredField::new("uid", FieldValue::String("42".into()))];
        let metadata = Metadata::new().with_timestamp(1);
        let rendered = render_json(
            Level::Info,
            LevelFormat::Upper,
            "ok",
            &fields,
            Some(&metadata),
            &TimestampFormat::Unix,
            true,
            true,
            true,
        );
        assert_eq!(rendered, r#"{"timestamp":"1","level":"INFO","msg":"ok","uid":"42"}"#);
    }

    #[test]
    fn json_field_order_is_insertion_order() {
        let fields = vec![
            StructuredField::new("a", FieldValue::Integer(1)),
            StructuredField::new("b", FieldValue::Integer(2)),
        ];
        let rendered = render_json(
            Level::Info,
            LevelFormat::Upper,
            "m",
            &fields,
            None,
            &TimestampFormat::Unix,
            false,
            false,
            false,
        );
        let a_pos = rendered.find("\"a\"").unwrap();
        let b_pos = rendered.find("\"b\"").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn json_attributes_follow_parent_field() {
        let field = StructuredField::new("user", FieldValue::String("bob".into()))
            .with_attribute("role", "admin");
        let rendered = render_json(
            Level::Info,
            LevelFormat::Upper,
            "m",
            &[field],
            None,
            &TimestampFormat::Unix,
            false,
            false,
            false,
        );
        assert_eq!(rendered, r#"{"user":"bob","user_role":"admin"}"#);
    }

    #[test]
    fn json_does_not_escape_interior_quotes() {
        let field = StructuredField::new("msg2", FieldValue::String("has \"quotes\"".into()));
        let rendered = render_json(
            Level::Info,
            LevelFormat::Upper,
            "m",
            &[field],
            None,
            &TimestampFormat::Unix,
            false,
            false,
            false,
        );
        assert!(rendered.contains("\"has \"quotes\"\""));
    }

    #[test]
    fn logfmt_quotes_value_with_space() {
        let fields = vec![StructuredField::new("k", FieldValue::String("a b".into()))];
        let rendered = render_delimited("m", &fields, " ", "=", false);
        assert!(rendered.contains("k=\"a b\""));
    }

    #[test]
    fn logfmt_escapes_quote_and_backslash() {
        let fields = vec![StructuredField::new("k", FieldValue::String("a\"b\\c".into()))];
        let rendered = render_delimited("m", &fields, " ", "=", false);
        assert!(rendered.contains("k=\"a\\\"b\\\\c\""));
    }

    #[test]
    fn custom_uses_configured_separators() {
        let fields = vec![StructuredField::new("k", FieldValue::String("v".into()))];
        let rendered = render_delimited("m", &fields, " | ", ":", false);
        assert_eq!(rendered, "k:v");
    }
}
