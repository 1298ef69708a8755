//! Bounded-queue async logging pipeline: a background worker drains a
//! drop-oldest queue and fans out to a list of sinks.

mod handlers;
mod processor;
mod queue;

pub use handlers::{ConsoleSink as AsyncConsoleHandler, FileSink as AsyncFileHandler};
pub use processor::{AsyncProcessor, AsyncStats};
pub use queue::{BoundedQueue, QueueClosed, QueueEntry};

use std::sync::Arc;

use crate::error::{ErrorHandler, Result};
use crate::level::{Level, Metadata};
use crate::sink::Sink;

/// Public entry point mirroring `Logger`: owns an `AsyncProcessor` and
/// exposes `start`/`stop`/`drain`/`get_stats` plus per-level push methods.
pub struct AsyncLogger {
    processor: AsyncProcessor,
    min_level: Level,
}

impl AsyncLogger {
    pub fn new(min_level: Level, queue_capacity: usize, handlers: Vec<Box<dyn Sink>>) -> Self {
        AsyncLogger {
            processor: AsyncProcessor::new(queue_capacity, handlers),
            min_level,
        }
    }

    pub fn with_error_handler(
        min_level: Level,
        queue_capacity: usize,
        handlers: Vec<Box<dyn Sink>>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        AsyncLogger {
            processor: AsyncProcessor::with_error_handler(queue_capacity, handlers, error_handler),
            min_level,
        }
    }

    pub fn start(&self) -> Result<()> {
        self.processor.start()
    }

    pub fn stop(&self) -> Result<()> {
        self.processor.stop()
    }

    pub fn drain(&self, timeout_ms: u64) -> Result<()> {
        self.processor.drain(timeout_ms)
    }

    pub fn flush(&self) {
        self.processor.flush();
    }

    pub fn get_stats(&self) -> AsyncStats {
        self.processor.get_stats()
    }

    fn push(&self, level: Level, message: &str, metadata: Option<Metadata>) {
        if level < self.min_level {
            return;
        }
        self.processor.push(level, message.to_string(), metadata);
    }

    pub fn trace(&self, message: &str, metadata: Option<Metadata>) {
        self.push(Level::Trace, message, metadata);
    }
    pub fn debug(&self, message: &str, metadata: Option<Metadata>) {
        self.push(Level::Debug, message, metadata);
    }
    pub fn info(&self, message: &str, metadata: Option<Metadata>) {
        self.push(Level::Info, message, metadata);
    }
    pub fn warn(&self, message: &str, metadata: Option<Metadata>) {
        self.push(Level::Warn, message, metadata);
    }
    pub fn error(&self, message: &str, metadata: Option<Metadata>) {
        self.push(Level::Error, message, metadata);
    }
    pub fn critical(&self, message: &str, metadata: Option<Metadata>) {
        self.push(Level::Critical, message, metadata);
    }
}
