//! Log level, metadata, and field value types shared across the crate.

use std::fmt;

/// A totally ordered log level.
///
/// Ordering follows declaration order: `Trace < Debug < Info < Warn < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl Level {
    /// All levels in ascending order.
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Critical,
    ];

    /// Long, uppercase name (`TRACE`, `DEBUG`, ...).
    pub fn long_name(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// 3-letter short name (`TRC`, `DBG`, `INF`, `WRN`, `ERR`, `CRT`).
    pub fn short_name(self) -> &'static str {
        match self {
            Level::Trace => "TRC",
            Level::Debug => "DBG",
            Level::Info => "INF",
            Level::Warn => "WRN",
            Level::Error => "ERR",
            Level::Critical => "CRT",
        }
    }

    /// ANSI color code for this level (SGR parameter, no escape wrapper).
    pub fn ansi_color(self) -> &'static str {
        match self {
            Level::Trace => "90",     // bright black / gray
            Level::Debug => "36",     // cyan
            Level::Info => "32",      // green
            Level::Warn => "33",      // yellow
            Level::Error => "31",     // red
            Level::Critical => "35", // magenta
        }
    }

    /// Parse a level name, case-insensitively. Accepts common aliases
    /// (`warning` -> `Warn`, `fatal` -> `Critical`).
    pub fn parse(name: &str) -> Option<Level> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "critical" | "fatal" => Some(Level::Critical),
            _ => None,
        }
    }

    /// Render this level according to a [`LevelFormat`].
    pub fn render(self, format: LevelFormat) -> &'static str {
        match format {
            LevelFormat::Upper => self.long_name(),
            LevelFormat::Lower => match self {
                Level::Trace => "trace",
                Level::Debug => "debug",
                Level::Info => "info",
                Level::Warn => "warn",
                Level::Error => "error",
                Level::Critical => "critical",
            },
            LevelFormat::ShortUpper => self.short_name(),
            LevelFormat::ShortLower => match self {
                Level::Trace => "trc",
                Level::Debug => "dbg",
                Level::Info => "inf",
                Level::Warn => "wrn",
                Level::Error => "err",
                Level::Critical => "crt",
            },
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

/// How a level should be rendered by the template formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelFormat {
    #[default]
    Upper,
    Lower,
    ShortUpper,
    ShortLower,
}

/// Request/trace correlation fields attached to a log call.
///
/// All fields are borrowed for the duration of the call; callers that need
/// to retain a [`Context`] beyond the call must clone it into an owned form
/// (every field here is already an owned `String` for that reason — the
/// logger itself never retains the *metadata* past the call, but the
/// context is cheap enough to carry by value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub request_id: Option<String>,
    pub correlation_id: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub operation: Option<String>,
    pub function: Option<String>,
    pub depth: Option<u32>,
    pub parent_function: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived helper: attach a correlation id, reading whatever was there
    /// and overwriting it. Named `add_correlation` per the embedding
    /// surface.
    pub fn add_correlation(&mut self, correlation_id: impl Into<String>) {
        self.correlation_id = Some(correlation_id.into());
    }
}

/// Fixed-shape metadata attached to a single log call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Unix seconds at call time.
    pub timestamp: Option<i64>,
    pub thread: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub context: Option<Context>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }
}

/// A tagged field value, the payload of one entry in a structured record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<FieldValue>),
    Object(Vec<(String, FieldValue)>),
    Null,
}

impl FieldValue {
    /// Render as a logfmt/custom-delimiter scalar (quoting handled by caller).
    pub fn to_plain_string(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(fv) => fv.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Null => "null".to_string(),
            FieldValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(FieldValue::to_plain_string).collect();
                format!("[{}]", parts.join(","))
            }
            FieldValue::Object(pairs) => {
                let parts: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.to_plain_string()))
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
        }
    }

    /// Convert to a `serde_json::Value`, preserving insertion order for objects.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Float(fv) => serde_json::Number::from_f64(*fv)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Array(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json_value).collect())
            }
            FieldValue::Object(pairs) => {
                let mut map = serde_json::Map::with_capacity(pairs.len());
                for (k, v) in pairs {
                    map.insert(k.clone(), v.to_json_value());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

/// A single named field in a structured record, with optional sibling
/// attributes that render as `name_key` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredField {
    pub name: String,
    pub value: FieldValue,
    pub attributes: Vec<(String, String)>,
}

impl StructuredField {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        StructuredField {
            name: name.into(),
            value: value.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Critical);
    }

    #[test]
    fn level_parse_aliases() {
        assert_eq!(Level::parse("WARNING"), Some(Level::Warn));
        assert_eq!(Level::parse("fatal"), Some(Level::Critical));
        assert_eq!(Level::parse("bogus"), None);
    }

    #[test]
    fn level_short_names() {
        assert_eq!(Level::Trace.short_name(), "TRC");
        assert_eq!(Level::Critical.short_name(), "CRT");
    }

    #[test]
    fn level_render_short_lower() {
        assert_eq!(Level::Info.render(LevelFormat::ShortLower), "inf");
    }

    #[test]
    fn field_value_plain_string() {
        let v = FieldValue::Array(vec![FieldValue::Integer(1), FieldValue::Integer(2)]);
        assert_eq!(v.to_plain_string(), "[1,2]");
    }

    #[test]
    fn context_add_correlation() {
        let mut ctx = Context::new();
        ctx.add_correlation("abc-123");
        assert_eq!(ctx.correlation_id.as_deref(), Some("abc-123"));
    }
}
