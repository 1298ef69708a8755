//! Template compilation and rendering.
//!
//! The template is parsed exactly once, at construction, into a cache of
//! segments (`Literal` spans and `Placeholder` descriptors); rendering then
//! walks the cache top-to-bottom with no further parsing, rather than
//! re-parsing a regex on every call. Construction fails fast on an
//! unbalanced `{`, an unrecognized name, or a malformed format spec.

use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::error::{NexlogError, Result};
use crate::level::{Level, LevelFormat, Metadata, StructuredField};

use super::structured::{render_delimited, render_json, StructuredFormat};

/// A registered handler for the `custom` placeholder (or a user-named
/// custom placeholder). Mirrors a `(allocator, level, message,
/// metadata) -> owned bytes` signature, minus the explicit allocator —
/// Rust's `Vec<u8>` already owns its storage.
pub type CustomHandler = Arc<dyn Fn(Level, &str, Option<&Metadata>) -> Vec<u8> + Send + Sync>;

/// How a resolved timestamp is textually rendered.
#[derive(Clone)]
pub enum TimestampFormat {
    Unix,
    Iso8601,
    /// A `{time:YYYY-MM-DD HH:mm:ss}`-style pattern, converted to a chrono
    /// strftime string via `convert_time_pattern`.
    Custom(String),
}

impl Default for TimestampFormat {
    fn default() -> Self {
        TimestampFormat::Unix
    }
}

fn convert_time_pattern(pattern: &str) -> String {
    pattern
        .replace("YYYY", "%Y")
        .replace("YY", "%y")
        .replace("MM", "%m")
        .replace("DD", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
        .replace("SSS", "%3f")
}

/// Render a Unix-seconds timestamp per the configured [`TimestampFormat`].
pub fn render_timestamp(unix_seconds: i64, format: &TimestampFormat) -> String {
    match format {
        TimestampFormat::Unix => unix_seconds.to_string(),
        TimestampFormat::Iso8601 => super::iso8601::unix_seconds_to_iso8601(unix_seconds),
        TimestampFormat::Custom(pattern) => {
            let chrono_pattern = convert_time_pattern(pattern);
            match chrono::DateTime::from_timestamp(unix_seconds, 0) {
                Some(dt) => dt.format(&chrono_pattern).to_string(),
                None => super::iso8601::unix_seconds_to_iso8601(unix_seconds),
            }
        }
    }
}

/// Recognized built-in placeholder kinds.
#[derive(Debug, Clone, PartialEq)]
enum PlaceholderKind {
    Timestamp(Option<String>),
    Level,
    Message,
    Thread,
    File,
    Line,
    Function,
    Color,
    Reset,
    RequestId,
    CorrelationId,
    TraceId,
    SpanId,
    UserId,
    SessionId,
    Operation,
    Component,
    /// `custom` itself, or a user-registered name; carries the lookup key.
    Custom(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(PlaceholderKind),
}

/// Full set of formatter knobs.
#[derive(Clone)]
pub struct FormatterConfig {
    pub template: String,
    pub level_format: LevelFormat,
    pub timestamp_format: TimestampFormat,
    pub use_color: bool,
    pub structured_format: StructuredFormat,
    pub custom_field_separator: String,
    pub custom_key_value_separator: String,
    pub stack_buffer_size: usize,
    pub include_timestamp: bool,
    pub include_level: bool,
    pub include_message: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        FormatterConfig {
            template: "[{timestamp}] [{color}{level}{reset}] [{file}:{line}] {message}".to_string(),
            level_format: LevelFormat::Upper,
            timestamp_format: TimestampFormat::Unix,
            use_color: true,
            structured_format: StructuredFormat::Json,
            custom_field_separator: " | ".to_string(),
            custom_key_value_separator: "=".to_string(),
            stack_buffer_size: 256,
            include_timestamp: true,
            include_level: true,
            include_message: true,
        }
    }
}

impl FormatterConfig {
    /// Default file-sink template: no color codes.
    pub fn file_default() -> Self {
        FormatterConfig {
            template: "[{timestamp}] [{level}] {message}".to_string(),
            use_color: false,
            ..FormatterConfig::default()
        }
    }
}

/// A compiled template, ready to render records without re-parsing.
pub struct TemplateFormatter {
    segments: Vec<Segment>,
    config: FormatterConfig,
    custom_handlers: AHashMap<String, CustomHandler>,
}

const RECOGNIZED_NAMES: &[&str] = &[
    "timestamp",
    "level",
    "message",
    "thread",
    "file",
    "line",
    "function",
    "color",
    "reset",
    "request_id",
    "correlation_id",
    "trace_id",
    "span_id",
    "user_id",
    "session_id",
    "operation",
    "component",
    "custom",
];

impl TemplateFormatter {
    /// Compile `config.template`, validating every placeholder against the
    /// recognized set plus `custom_handlers`. Fails with
    /// `NexlogError::Config` on an unbalanced `{`, an unknown name, or a
    /// malformed format spec.
    pub fn new(config: FormatterConfig, custom_handlers: AHashMap<String, CustomHandler>) -> Result<Self> {
        let segments = parse_template(&config.template, &custom_handlers)?;
        Ok(TemplateFormatter {
            segments,
            config,
            custom_handlers,
        })
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    fn resolve_timestamp(&self, metadata: Option<&Metadata>) -> i64 {
        metadata
            .and_then(|m| m.timestamp)
            .unwrap_or_else(|| chrono::Utc::now().timestamp())
    }

    fn render_placeholder(
        &self,
        kind: &PlaceholderKind,
        level: Level,
        message: &str,
        metadata: Option<&Metadata>,
    ) -> Vec<u8> {
        let ctx = metadata.and_then(|m| m.context.as_ref());
        let s = |opt: Option<&str>| opt.unwrap_or("-").to_string();
        match kind {
            PlaceholderKind::Timestamp(pattern) => {
                let ts = self.resolve_timestamp(metadata);
                let format = match pattern {
                    Some(p) => TimestampFormat::Custom(p.clone()),
                    None => self.config.timestamp_format.clone(),
                };
                render_timestamp(ts, &format).into_bytes()
            }
            PlaceholderKind::Level => level.render(self.config.level_format).as_bytes().to_vec(),
            PlaceholderKind::Message => message.as_bytes().to_vec(),
            PlaceholderKind::Thread => metadata
                .and_then(|m| m.thread.as_deref())
                .unwrap_or("")
                .as_bytes()
                .to_vec(),
            PlaceholderKind::File => metadata
                .and_then(|m| m.file.as_deref())
                .unwrap_or("")
                .as_bytes()
                .to_vec(),
            PlaceholderKind::Line => metadata
                .and_then(|m| m.line)
                .map(|l| l.to_string())
                .unwrap_or_default()
                .into_bytes(),
            PlaceholderKind::Function => metadata
                .and_then(|m| m.function.as_deref())
                .unwrap_or("")
                .as_bytes()
                .to_vec(),
            PlaceholderKind::Color => {
                if self.config.use_color {
                    format!("\x1b[{}m", level.ansi_color()).into_bytes()
                } else {
                    Vec::new()
                }
            }
            PlaceholderKind::Reset => {
                if self.config.use_color {
                    b"\x1b[0m".to_vec()
                } else {
                    Vec::new()
                }
            }
            PlaceholderKind::RequestId => s(ctx.and_then(|c| c.request_id.as_deref())).into_bytes(),
            PlaceholderKind::CorrelationId => {
                s(ctx.and_then(|c| c.correlation_id.as_deref())).into_bytes()
            }
            PlaceholderKind::TraceId => s(ctx.and_then(|c| c.trace_id.as_deref())).into_bytes(),
            PlaceholderKind::SpanId => s(ctx.and_then(|c| c.span_id.as_deref())).into_bytes(),
            PlaceholderKind::UserId => s(ctx.and_then(|c| c.user_id.as_deref())).into_bytes(),
            PlaceholderKind::SessionId => s(ctx.and_then(|c| c.session_id.as_deref())).into_bytes(),
            PlaceholderKind::Operation => s(ctx.and_then(|c| c.operation.as_deref())).into_bytes(),
            // `component` has no backing metadata field in the data model;
            // it renders as absent unless a custom handler claims the name.
            PlaceholderKind::Component => b"-".to_vec(),
            PlaceholderKind::Custom(name) => match self.custom_handlers.get(name) {
                Some(handler) => handler(level, message, metadata),
                None => Vec::new(),
            },
        }
    }

    /// Render a free-form record into an owned string. The output is built
    /// in a buffer pre-reserved to `config.stack_buffer_size` bytes; the
    /// inline array covers the common case without a heap hit, and
    /// `with_capacity` reserves the configured size up front so a render
    /// past the inline size spills to a single right-sized heap allocation
    /// rather than repeated growth.
    pub fn format(&self, level: Level, message: &str, metadata: Option<&Metadata>) -> String {
        let mut buf: SmallVec<[u8; 256]> = SmallVec::with_capacity(self.config.stack_buffer_size);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => buf.extend_from_slice(text.as_bytes()),
                Segment::Placeholder(kind) => {
                    let rendered = self.render_placeholder(kind, level, message, metadata);
                    buf.extend_from_slice(&rendered);
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Render a structured (JSON/logfmt/custom) record.
    pub fn format_structured(
        &self,
        level: Level,
        message: &str,
        fields: &[StructuredField],
        metadata: Option<&Metadata>,
    ) -> String {
        match &self.config.structured_format {
            StructuredFormat::Json => render_json(
                level,
                self.config.level_format,
                message,
                fields,
                metadata,
                &self.config.timestamp_format,
                self.config.include_timestamp,
                self.config.include_level,
                self.config.include_message,
            ),
            StructuredFormat::Logfmt => {
                render_delimited(message, fields, " ", "=", self.config.include_message)
            }
            StructuredFormat::Custom {
                field_separator,
                key_value_separator,
            } => render_delimited(
                message,
                fields,
                field_separator,
                key_value_separator,
                self.config.include_message,
            ),
        }
    }
}

fn placeholder_kind_for(name: &str, spec: Option<&str>, custom_handlers: &AHashMap<String, CustomHandler>) -> Result<PlaceholderKind> {
    match name {
        "timestamp" => Ok(PlaceholderKind::Timestamp(spec.map(str::to_string))),
        "custom" => Ok(PlaceholderKind::Custom(
            spec.map(str::to_string).unwrap_or_else(|| "custom".to_string()),
        )),
        _ if spec.is_some() => Err(NexlogError::Config(format!(
            "placeholder '{{{}}}' does not accept a format spec",
            name
        ))),
        "level" => Ok(PlaceholderKind::Level),
        "message" => Ok(PlaceholderKind::Message),
        "thread" => Ok(PlaceholderKind::Thread),
        "file" => Ok(PlaceholderKind::File),
        "line" => Ok(PlaceholderKind::Line),
        "function" => Ok(PlaceholderKind::Function),
        "color" => Ok(PlaceholderKind::Color),
        "reset" => Ok(PlaceholderKind::Reset),
        "request_id" => Ok(PlaceholderKind::RequestId),
        "correlation_id" => Ok(PlaceholderKind::CorrelationId),
        "trace_id" => Ok(PlaceholderKind::TraceId),
        "span_id" => Ok(PlaceholderKind::SpanId),
        "user_id" => Ok(PlaceholderKind::UserId),
        "session_id" => Ok(PlaceholderKind::SessionId),
        "operation" => Ok(PlaceholderKind::Operation),
        "component" => Ok(PlaceholderKind::Component),
        _ if custom_handlers.contains_key(name) => Ok(PlaceholderKind::Custom(name.to_string())),
        _ => Err(NexlogError::Config(format!(
            "unknown placeholder '{{{}}}': not a recognized name and no custom handler registered",
            name
        ))),
    }
}

fn parse_template(template: &str, custom_handlers: &AHashMap<String, CustomHandler>) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c == '{' {
            let mut name_and_spec = String::new();
            let mut closed = false;
            for (_, c2) in chars.by_ref() {
                if c2 == '}' {
                    closed = true;
                    break;
                }
                name_and_spec.push(c2);
            }
            if !closed {
                return Err(NexlogError::Config(format!(
                    "unbalanced '{{' in template: '{}'",
                    template
                )));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            let (name, spec) = match name_and_spec.split_once(':') {
                Some((n, s)) => (n, Some(s)),
                None => (name_and_spec.as_str(), None),
            };
            let kind = placeholder_kind_for(name, spec, custom_handlers)?;
            segments.push(Segment::Placeholder(kind));
        } else if c == '}' {
            return Err(NexlogError::Config(format!(
                "unmatched '}}' in template: '{}'",
                template
            )));
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Context;

    fn formatter(template: &str) -> TemplateFormatter {
        let config = FormatterConfig {
            template: template.to_string(),
            use_color: false,
            ..FormatterConfig::default()
        };
        TemplateFormatter::new(config, AHashMap::new()).unwrap()
    }

    #[test]
    fn scenario_basic_template() {
        let fmt = formatter("[{timestamp}] [{level}] {message}");
        let metadata = Metadata::new().with_timestamp(1_640_995_200);
        let out = fmt.format(Level::Info, "hello", Some(&metadata));
        assert_eq!(out, "[1640995200] [INFO] hello");
    }

    #[test]
    fn scenario_short_lower_level() {
        let config = FormatterConfig {
            template: "[{timestamp}] [{level}] {message}".to_string(),
            level_format: LevelFormat::ShortLower,
            use_color: false,
            ..FormatterConfig::default()
        };
        let fmt = TemplateFormatter::new(config, AHashMap::new()).unwrap();
        let metadata = Metadata::new().with_timestamp(1_640_995_200);
        let out = fmt.format(Level::Info, "hello", Some(&metadata));
        assert_eq!(out, "[1640995200] [inf] hello");
    }

    #[test]
    fn unbalanced_brace_fails_construction() {
        let config = FormatterConfig {
            template: "[{timestamp] {message}".to_string(),
            ..FormatterConfig::default()
        };
        assert!(TemplateFormatter::new(config, AHashMap::new()).is_err());
    }

    #[test]
    fn unknown_placeholder_fails_construction() {
        let config = FormatterConfig {
            template: "{bogus}".to_string(),
            ..FormatterConfig::default()
        };
        assert!(TemplateFormatter::new(config, AHashMap::new()).is_err());
    }

    #[test]
    fn format_spec_on_non_timestamp_is_malformed() {
        let config = FormatterConfig {
            template: "{level:upper}".to_string(),
            ..FormatterConfig::default()
        };
        assert!(TemplateFormatter::new(config, AHashMap::new()).is_err());
    }

    #[test]
    fn custom_time_pattern() {
        let fmt = formatter("{timestamp:YYYY-MM-DD}");
        let metadata = Metadata::new().with_timestamp(1_673_740_800); // 2023-01-15
        let out = fmt.format(Level::Info, "m", Some(&metadata));
        assert_eq!(out, "2023-01-15");
    }

    #[test]
    fn context_fields_default_to_dash() {
        let fmt = formatter("{request_id}");
        let out = fmt.format(Level::Info, "m", None);
        assert_eq!(out, "-");
    }

    #[test]
    fn context_fields_render_when_present() {
        let fmt = formatter("{request_id}/{operation}");
        let mut ctx = Context::new();
        ctx.request_id = Some("req-1".to_string());
        ctx.operation = Some("checkout".to_string());
        let metadata = Metadata::new().with_context(ctx);
        let out = fmt.format(Level::Info, "m", Some(&metadata));
        assert_eq!(out, "req-1/checkout");
    }

    #[test]
    fn color_and_reset_emit_ansi_when_enabled() {
        let config = FormatterConfig {
            template: "{color}{level}{reset}".to_string(),
            use_color: true,
            ..FormatterConfig::default()
        };
        let fmt = TemplateFormatter::new(config, AHashMap::new()).unwrap();
        let out = fmt.format(Level::Error, "m", None);
        assert_eq!(out, "\x1b[31mERROR\x1b[0m");
    }

    #[test]
    fn color_suppressed_when_disabled() {
        let fmt = formatter("{color}{level}{reset}");
        let out = fmt.format(Level::Error, "m", None);
        assert_eq!(out, "ERROR");
    }

    #[test]
    fn custom_placeholder_invokes_handler() {
        let mut handlers: AHashMap<String, CustomHandler> = AHashMap::new();
        handlers.insert(
            "shout".to_string(),
            Arc::new(|_level, message, _meta| message.to_uppercase().into_bytes()),
        );
        let config = FormatterConfig {
            template: "{shout}".to_string(),
            ..FormatterConfig::default()
        };
        let fmt = TemplateFormatter::new(config, handlers).unwrap();
        let out = fmt.format(Level::Info, "hi", None);
        assert_eq!(out, "HI");
    }

    #[test]
    fn structured_json_round_trips_field_names() {
        let fmt = formatter("{message}");
        let fields = vec![
            StructuredField::new("alpha", crate::level::FieldValue::Integer(1)),
            StructuredField::new("beta", crate::level::FieldValue::Integer(2)),
        ];
        let out = fmt.format_structured(Level::Info, "m", &fields, None);
        for name in ["alpha", "beta"] {
            assert!(out.contains(&format!("\"{}\":", name)));
        }
    }

    #[test]
    fn default_console_template_matches_documented_value() {
        let config = FormatterConfig::default();
        assert_eq!(
            config.template,
            "[{timestamp}] [{color}{level}{reset}] [{file}:{line}] {message}"
        );
    }

    #[test]
    fn default_file_template_has_colors_disabled() {
        let config = FormatterConfig::file_default();
        assert_eq!(config.template, "[{timestamp}] [{level}] {message}");
        assert!(!config.use_color);
    }

    #[test]
    fn large_stack_buffer_size_avoids_reallocation_growth() {
        let config = FormatterConfig {
            template: "{message}".to_string(),
            stack_buffer_size: 4096,
            use_color: false,
            ..FormatterConfig::default()
        };
        let fmt = TemplateFormatter::new(config, AHashMap::new()).unwrap();
        let long_message = "x".repeat(4000);
        let out = fmt.format(Level::Info, &long_message, None);
        assert_eq!(out, long_message);
    }
}
