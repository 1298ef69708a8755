//! Flat logger configuration, with environment-variable overrides and
//! constructors that assemble a ready-to-use [`Logger`]/[`AsyncLogger`].

use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashMap;

use crate::async_pipeline::AsyncLogger;
use crate::error::{validate_level, validate_size, ErrorHandler, Result, StderrErrorHandler};
use crate::format::{CustomHandler, FormatterConfig, StructuredFormat, TemplateFormatter, TimestampFormat};
use crate::level::{Level, LevelFormat};
use crate::logger::Logger;
use crate::sink::{ConsoleSink, ConsoleTarget, FileSink, FileSinkConfig, RotationMode};

/// All knobs needed to assemble a logger. Defaults mirror a minimal,
/// console-only setup with file logging disabled.
#[derive(Clone)]
pub struct LoggerConfig {
    pub level: Level,
    pub enable_console_logging: bool,
    pub console_use_color: bool,
    pub console_fast_mode: bool,

    pub enable_file_logging: bool,
    pub file_path: Option<PathBuf>,
    pub max_file_size: u64,
    pub max_rotated_files: usize,
    pub enable_rotation: bool,
    pub rotation_mode: RotationMode,
    pub rotation_interval_secs: u64,
    pub compress_rotated_files: bool,
    pub flush_interval_ms: u64,
    pub file_buffer_capacity: usize,

    pub async_queue_capacity: usize,

    /// Optional embedded formatter overrides, applied on top of the
    /// console/file default templates. `None` leaves the corresponding
    /// `FormatterConfig::default()`/`file_default()` value untouched.
    pub template: Option<String>,
    pub timestamp_format: Option<TimestampFormat>,
    pub level_format: Option<LevelFormat>,
    pub structured_format: Option<StructuredFormat>,
    pub custom_field_separator: Option<String>,
    pub custom_key_value_separator: Option<String>,
    pub stack_buffer_size: Option<usize>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: Level::Info,
            enable_console_logging: true,
            console_use_color: true,
            console_fast_mode: false,

            enable_file_logging: false,
            file_path: None,
            max_file_size: 10 * 1024 * 1024,
            max_rotated_files: 5,
            enable_rotation: true,
            rotation_mode: RotationMode::Size,
            rotation_interval_secs: 86_400,
            compress_rotated_files: false,
            flush_interval_ms: 5000,
            file_buffer_capacity: 4096,

            async_queue_capacity: 10_000,

            template: None,
            timestamp_format: None,
            level_format: None,
            structured_format: None,
            custom_field_separator: None,
            custom_key_value_separator: None,
            stack_buffer_size: None,
        }
    }
}

impl LoggerConfig {
    /// Apply any `Some` embedded-formatter override on top of `base`. `base`
    /// is `FormatterConfig::default()` for the console sink or
    /// `FormatterConfig::file_default()` for the file sink; `use_color` is
    /// set from the caller rather than taken from this config's overrides,
    /// since console and file sinks honor color independently.
    fn formatter_config(&self, mut base: FormatterConfig, use_color: bool) -> FormatterConfig {
        base.use_color = use_color;
        if let Some(template) = &self.template {
            base.template = template.clone();
        }
        if let Some(timestamp_format) = &self.timestamp_format {
            base.timestamp_format = timestamp_format.clone();
        }
        if let Some(level_format) = self.level_format {
            base.level_format = level_format;
        }
        if let Some(structured_format) = &self.structured_format {
            base.structured_format = structured_format.clone();
        }
        if let Some(sep) = &self.custom_field_separator {
            base.custom_field_separator = sep.clone();
        }
        if let Some(sep) = &self.custom_key_value_separator {
            base.custom_key_value_separator = sep.clone();
        }
        if let Some(size) = self.stack_buffer_size {
            base.stack_buffer_size = size;
        }
        base
    }

    /// Apply `NEXLOG_LEVEL`, `NEXLOG_COLOR`, `NEXLOG_FILE`, `NEXLOG_FORMAT`
    /// overrides on top of the current values. Invalid values are reported
    /// via the error handler and leave the existing value untouched.
    pub fn from_env_overrides(mut self, error_handler: &dyn ErrorHandler) -> Self {
        if let Ok(level_str) = std::env::var("NEXLOG_LEVEL") {
            match validate_level(&level_str) {
                Ok(level) => self.level = level,
                Err(err) => error_handler.handle(&crate::error::ErrorContext::new(
                    "Config",
                    err.to_string(),
                    file!(),
                    line!(),
                )),
            }
        }
        if let Ok(color_str) = std::env::var("NEXLOG_COLOR") {
            self.console_use_color = matches!(color_str.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Ok(file_str) = std::env::var("NEXLOG_FILE") {
            if !file_str.is_empty() {
                self.enable_file_logging = true;
                self.file_path = Some(PathBuf::from(file_str));
            }
        }
        if let Ok(format_str) = std::env::var("NEXLOG_FORMAT") {
            match format_str.to_ascii_lowercase().as_str() {
                "json" => self.structured_format = Some(StructuredFormat::Json),
                "logfmt" => self.structured_format = Some(StructuredFormat::Logfmt),
                "custom" => {
                    self.structured_format = Some(StructuredFormat::Custom {
                        field_separator: self.custom_field_separator.clone().unwrap_or_else(|| " | ".to_string()),
                        key_value_separator: self.custom_key_value_separator.clone().unwrap_or_else(|| "=".to_string()),
                    })
                }
                other => error_handler.handle(&crate::error::ErrorContext::new(
                    "Config",
                    format!("invalid NEXLOG_FORMAT value '{}': expected json, logfmt, or custom", other),
                    file!(),
                    line!(),
                )),
            }
        }
        if let Ok(size_str) = std::env::var("NEXLOG_MAX_FILE_SIZE") {
            match validate_size(&size_str) {
                Ok(bytes) => self.max_file_size = bytes,
                Err(err) => error_handler.handle(&crate::error::ErrorContext::new(
                    "Config",
                    err.to_string(),
                    file!(),
                    line!(),
                )),
            }
        }
        self
    }

    /// Build a synchronous [`Logger`] with console and (if enabled) file
    /// sinks wired up per this config.
    pub fn build(&self, custom_handlers: AHashMap<String, CustomHandler>) -> Result<Logger> {
        self.build_with_error_handler(custom_handlers, Arc::new(StderrErrorHandler))
    }

    pub fn build_with_error_handler(
        &self,
        custom_handlers: AHashMap<String, CustomHandler>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<Logger> {
        let logger = Logger::with_error_handler(self.level, custom_handlers.clone(), error_handler.clone())?;

        if self.enable_console_logging {
            let console_config = self.formatter_config(FormatterConfig::default(), self.console_use_color);
            let console_formatter = TemplateFormatter::new(console_config, custom_handlers.clone())?;
            let console = ConsoleSink::new(ConsoleTarget::Stdout, self.level, console_formatter)
                .with_fast_mode(self.console_fast_mode);
            logger.add_handler(Box::new(console));
        }

        if self.enable_file_logging {
            let path = self
                .file_path
                .clone()
                .ok_or_else(|| crate::error::NexlogError::Config("file logging enabled without a file_path".to_string()))?;
            let file_config = self.formatter_config(FormatterConfig::file_default(), false);
            let file_formatter = TemplateFormatter::new(file_config, custom_handlers)?;
            let file_sink_config = FileSinkConfig {
                path,
                min_level: self.level,
                max_size: self.max_file_size,
                rotation_interval_secs: self.rotation_interval_secs,
                rotation_mode: if self.enable_rotation { self.rotation_mode } else { RotationMode::Size },
                max_rotated_files: if self.enable_rotation { self.max_rotated_files } else { 0 },
                compress: self.compress_rotated_files,
                flush_interval_ms: self.flush_interval_ms,
                buffer_capacity: self.file_buffer_capacity,
            };
            let file_sink = FileSink::with_error_handler(file_sink_config, file_formatter, error_handler)?;
            logger.add_handler(Box::new(file_sink));
        }

        Ok(logger)
    }

    /// Build an [`AsyncLogger`] with the same sink set, fanned out from the
    /// background worker instead of the caller's thread.
    pub fn build_async(&self, custom_handlers: AHashMap<String, CustomHandler>) -> Result<AsyncLogger> {
        self.build_async_with_error_handler(custom_handlers, Arc::new(StderrErrorHandler))
    }

    pub fn build_async_with_error_handler(
        &self,
        custom_handlers: AHashMap<String, CustomHandler>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<AsyncLogger> {
        let mut handlers: Vec<Box<dyn crate::sink::Sink>> = Vec::new();

        if self.enable_console_logging {
            let console_config = self.formatter_config(FormatterConfig::default(), self.console_use_color);
            let console_formatter = TemplateFormatter::new(console_config, custom_handlers.clone())?;
            let console = ConsoleSink::new(ConsoleTarget::Stdout, self.level, console_formatter)
                .with_fast_mode(self.console_fast_mode);
            handlers.push(Box::new(console));
        }

        if self.enable_file_logging {
            let path = self
                .file_path
                .clone()
                .ok_or_else(|| crate::error::NexlogError::Config("file logging enabled without a file_path".to_string()))?;
            let file_config = self.formatter_config(FormatterConfig::file_default(), false);
            let file_formatter = TemplateFormatter::new(file_config, custom_handlers)?;
            let file_sink_config = FileSinkConfig {
                path,
                min_level: self.level,
                max_size: self.max_file_size,
                rotation_interval_secs: self.rotation_interval_secs,
                rotation_mode: if self.enable_rotation { self.rotation_mode } else { RotationMode::Size },
                max_rotated_files: if self.enable_rotation { self.max_rotated_files } else { 0 },
                compress: self.compress_rotated_files,
                flush_interval_ms: self.flush_interval_ms,
                buffer_capacity: self.file_buffer_capacity,
            };
            let file_sink = FileSink::with_error_handler(file_sink_config, file_formatter, error_handler.clone())?;
            handlers.push(Box::new(file_sink));
        }

        Ok(AsyncLogger::with_error_handler(
            self.level,
            self.async_queue_capacity,
            handlers,
            error_handler,
        ))
    }
}
