//! Error taxonomy and the injectable error-reporting surface.
//!
//! One variant per failure category, a `Display` impl that renders a
//! human message, and small `validate_*` helpers used at construction
//! boundaries.

use std::fmt;
use std::time::Instant;

use crate::level::Level;

/// Error kinds.
#[derive(Debug)]
pub enum NexlogError {
    /// Invalid buffer/file size, malformed template, unknown placeholder,
    /// conflicting options. Fatal for the constructor that raised it.
    Config(String),
    /// Any OS-level file/socket failure, rename collisions, disk full.
    Io(String),
    /// Circular buffer overflow, underflow, or full-after-compaction.
    Buffer(BufferError),
    /// Already-initialized global, not-started async logger, queue closed.
    State(String),
    /// Catch-all.
    Unexpected(String),
}

/// Specific circular-buffer failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// `bytes.len() > capacity`: even an empty buffer could never hold this write.
    Overflow,
    /// The buffer has no free room for this write, even after compaction.
    Full,
    /// A read was attempted on an empty buffer.
    Underflow,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            BufferError::Overflow => "write exceeds buffer capacity",
            BufferError::Full => "buffer full after compaction",
            BufferError::Underflow => "read attempted on empty buffer",
        };
        f.write_str(msg)
    }
}

impl fmt::Display for NexlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NexlogError::Config(msg) => write!(f, "configuration error: {}", msg),
            NexlogError::Io(msg) => write!(f, "I/O error: {}", msg),
            NexlogError::Buffer(e) => write!(f, "buffer error: {}", e),
            NexlogError::State(msg) => write!(f, "state error: {}", msg),
            NexlogError::Unexpected(msg) => write!(f, "unexpected error: {}", msg),
        }
    }
}

impl std::error::Error for NexlogError {}

impl From<std::io::Error> for NexlogError {
    fn from(err: std::io::Error) -> Self {
        NexlogError::Io(err.to_string())
    }
}

impl From<BufferError> for NexlogError {
    fn from(err: BufferError) -> Self {
        NexlogError::Buffer(err)
    }
}

/// Convenient Result type alias for nexlog operations.
pub type Result<T> = std::result::Result<T, NexlogError>;

/// Context handed to an [`ErrorHandler`] when a sink or pipeline stage fails.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub kind: String,
    pub message: String,
    pub file: &'static str,
    pub line: u32,
    pub timestamp: i64,
}

impl ErrorContext {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, file: &'static str, line: u32) -> Self {
        ErrorContext {
            kind: kind.into(),
            message: message.into(),
            file,
            line,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Injectable error reporting surface.
///
/// A handler may retry; the pipeline itself does not retry writes, only the
/// handler's own reporting of the failure.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, ctx: &ErrorContext);
}

/// Default handler: prints to standard error.
pub struct StderrErrorHandler;

impl ErrorHandler for StderrErrorHandler {
    fn handle(&self, ctx: &ErrorContext) {
        eprintln!(
            "[nexlog] {} at {}:{}: {}",
            ctx.kind, ctx.file, ctx.line, ctx.message
        );
    }
}

/// A handler wrapper that retries an inner handler up to `max_retries`
/// times with `retry_delay_ms` between attempts. Retrying here means
/// re-invoking the handler's `handle` call (e.g. a network-backed
/// handler), not retrying the original failed write.
pub struct RetryingErrorHandler<H: ErrorHandler> {
    inner: H,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl<H: ErrorHandler> RetryingErrorHandler<H> {
    pub fn new(inner: H, max_retries: u32, retry_delay_ms: u64) -> Self {
        RetryingErrorHandler {
            inner,
            max_retries,
            retry_delay_ms,
        }
    }
}

impl<H: ErrorHandler> ErrorHandler for RetryingErrorHandler<H> {
    fn handle(&self, ctx: &ErrorContext) {
        let start = Instant::now();
        for attempt in 0..=self.max_retries {
            self.inner.handle(ctx);
            if attempt < self.max_retries {
                std::thread::sleep(std::time::Duration::from_millis(self.retry_delay_ms));
            }
        }
        let _ = start.elapsed();
    }
}

/// Validate a log level string, case-insensitively, including aliases.
pub fn validate_level(level: &str) -> Result<Level> {
    Level::parse(level).ok_or_else(|| {
        NexlogError::Config(format!(
            "invalid log level '{}': expected one of trace, debug, info, warn, error, critical",
            level
        ))
    })
}

/// Parse a human size string ("10MB", "512KiB", plain byte counts) into a
/// byte count, delegating to `byte-unit`.
pub fn validate_size(size: &str) -> Result<u64> {
    byte_unit::Byte::parse_str(size, true)
        .map(|b| b.as_u64())
        .map_err(|_| NexlogError::Config(format!("invalid size string '{}'", size)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_level_ok_and_err() {
        assert!(validate_level("info").is_ok());
        assert!(validate_level("bogus").is_err());
    }

    #[test]
    fn validate_size_parses_units() {
        assert_eq!(validate_size("1KB").unwrap(), 1000);
        assert_eq!(validate_size("1KiB").unwrap(), 1024);
    }

    #[test]
    fn error_display_contains_kind() {
        let err = NexlogError::Buffer(BufferError::Full);
        assert!(err.to_string().contains("buffer error"));
    }

    #[test]
    fn stderr_handler_does_not_panic() {
        let handler = StderrErrorHandler;
        let ctx = ErrorContext::new("Io", "disk full", file!(), line!());
        handler.handle(&ctx);
    }
}
