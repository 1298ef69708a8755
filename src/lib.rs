//! High-throughput, embeddable logging core.
//!
//! The library is organized into focused modules:
//! - `buffer`: bounded circular byte buffer with compaction and health telemetry
//! - `format`: template compilation and JSON/logfmt/custom structured rendering
//! - `sink`: the console and file output destinations
//! - `logger`: the synchronous, mutex-guarded fan-out logger
//! - `async_pipeline`: the bounded drop-oldest queue and background worker
//! - `config`: flat configuration plus environment-variable overrides
//! - `context`: thread-local request/trace correlation fields
//! - `convenience`: thin pass-through functions over a process-wide default logger

mod async_pipeline;
mod buffer;
pub mod context;
mod config;
pub mod convenience;
mod error;
mod format;
mod level;
mod logger;
mod sink;

pub use async_pipeline::{AsyncConsoleHandler, AsyncFileHandler, AsyncLogger, AsyncProcessor, AsyncStats};
pub use buffer::{CircularBuffer, HealthReport, HealthStatus};
pub use config::LoggerConfig;
pub use error::{BufferError, ErrorContext, ErrorHandler, NexlogError, Result, RetryingErrorHandler, StderrErrorHandler};
pub use format::{CustomHandler, FormatterConfig, StructuredFormat, TemplateFormatter, TimestampFormat};
pub use level::{Context, FieldValue, Level, LevelFormat, Metadata, StructuredField};
pub use logger::Logger;
pub use sink::{ConsoleSink, ConsoleTarget, FileSink, FileSinkConfig, NetworkSinkUnavailable, RotationMode, Sink, SinkKind};
