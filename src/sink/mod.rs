//! Sink (handler) contract and the two first-party implementations
//! (console, file).

mod console;
mod file;

pub use console::{ConsoleSink, ConsoleTarget};
pub use file::{FileSink, FileSinkConfig, RotationMode};

use crate::error::Result;
use crate::level::{Level, Metadata};

/// Which kind of sink a [`Sink`] trait object is, used by the logger to
/// pick console-vs-file formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    File,
    User,
}

/// Uniform, polymorphic contract every destination implements. Replaces
/// a hand-rolled vtable with a plain trait object (`Box<dyn Sink>`).
pub trait Sink: Send {
    /// Entry point for callers that bypass the logger's formatter
    /// selection (the async worker, mainly): the sink formats the record
    /// with its own internally owned formatter.
    fn write_structured(&mut self, level: Level, message: &str, metadata: Option<&Metadata>) -> Result<()>;

    /// Entry point for the logger's fan-out, where a formatter has already
    /// rendered the bytes to write.
    fn write_preformatted(&mut self, bytes: &[u8]) -> Result<()>;

    /// Durably commit buffered bytes.
    fn flush(&mut self) -> Result<()>;

    /// Flush then release resources. Called once, at teardown.
    fn close(&mut self) -> Result<()>;

    /// This sink's minimum level; records below it are dropped before
    /// `write_preformatted`/`write_structured` is even called.
    fn min_level(&self) -> Level;

    fn kind(&self) -> SinkKind;
}

/// The network sink is deprecated and not implemented. This stub documents
/// the gap and fails loudly if anyone tries to construct it, rather than
/// silently doing nothing.
pub struct NetworkSinkUnavailable;

impl NetworkSinkUnavailable {
    pub fn unavailable() -> crate::error::NexlogError {
        crate::error::NexlogError::Config(
            "network sink is deprecated and not implemented (no TLS, not production-ready)"
                .to_string(),
        )
    }
}
