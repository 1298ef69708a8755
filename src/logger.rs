//! Synchronous logger: an ordered set of sinks behind one mutex, so a single
//! log call's fan-out to every sink is atomic with respect to other callers.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::error::{ErrorContext, ErrorHandler, Result, StderrErrorHandler};
use crate::format::{CustomHandler, FormatterConfig, TemplateFormatter};
use crate::level::{Level, Metadata};
use crate::sink::{Sink, SinkKind};

struct LoggerState {
    sinks: Vec<Box<dyn Sink>>,
    console_formatter: TemplateFormatter,
    file_formatter: TemplateFormatter,
}

/// Owns an ordered list of sinks, a console formatter (colors honored per
/// config) and a file formatter (colors always disabled), both rendering
/// a shared pool of custom placeholder handlers.
pub struct Logger {
    state: Mutex<LoggerState>,
    min_level: Level,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Logger {
    pub fn new(min_level: Level, custom_handlers: AHashMap<String, CustomHandler>) -> Result<Self> {
        Self::with_error_handler(min_level, custom_handlers, Arc::new(StderrErrorHandler))
    }

    pub fn with_error_handler(
        min_level: Level,
        custom_handlers: AHashMap<String, CustomHandler>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<Self> {
        let console_formatter = TemplateFormatter::new(FormatterConfig::default(), custom_handlers.clone())?;
        let file_formatter = TemplateFormatter::new(FormatterConfig::file_default(), custom_handlers)?;
        Ok(Logger {
            state: Mutex::new(LoggerState {
                sinks: Vec::new(),
                console_formatter,
                file_formatter,
            }),
            min_level,
            error_handler,
        })
    }

    /// Register a sink, returning its index (used by `remove_handler`).
    pub fn add_handler(&self, sink: Box<dyn Sink>) -> usize {
        let mut state = self.state.lock();
        state.sinks.push(sink);
        state.sinks.len() - 1
    }

    /// Remove a previously registered sink by index. Returns `false` if the
    /// index is out of range or was already removed.
    pub fn remove_handler(&self, index: usize) -> bool {
        let mut state = self.state.lock();
        if index < state.sinks.len() {
            state.sinks.remove(index);
            true
        } else {
            false
        }
    }

    fn report(&self, kind: &str, message: String) {
        self.error_handler
            .handle(&ErrorContext::new(kind, message, file!(), line!()));
    }

    /// Level gate, then fan out to every registered sink in order, choosing
    /// the console or file formatter by the sink's declared kind. A failure
    /// in one sink is reported and does not stop delivery to the rest.
    pub fn log(&self, level: Level, message: &str, metadata: Option<&Metadata>) {
        if level < self.min_level {
            return;
        }
        let mut state = self.state.lock();
        for sink in state.sinks.iter_mut() {
            if level < sink.min_level() {
                continue;
            }
            let rendered = match sink.kind() {
                SinkKind::File => state.file_formatter.format(level, message, metadata),
                SinkKind::Console | SinkKind::User => state.console_formatter.format(level, message, metadata),
            };
            if let Err(err) = sink.write_preformatted(rendered.as_bytes()) {
                self.report("Sink", err.to_string());
            }
        }
    }

    /// Flush every sink, reporting (but not stopping on) individual failures.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        for sink in state.sinks.iter_mut() {
            if let Err(err) = sink.flush() {
                self.report("Sink", err.to_string());
            }
        }
    }

    /// Flush then close every sink. Called once, at teardown.
    pub fn close(&self) {
        let mut state = self.state.lock();
        for sink in state.sinks.iter_mut() {
            if let Err(err) = sink.close() {
                self.report("Sink", err.to_string());
            }
        }
    }

    fn log_best_effort(&self, level: Level, message: &str, metadata: Option<&Metadata>) {
        self.log(level, message, metadata);
        self.flush();
    }

    pub fn trace(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(Level::Trace, message, metadata);
    }
    pub fn debug(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(Level::Debug, message, metadata);
    }
    pub fn info(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(Level::Info, message, metadata);
    }
    pub fn warn(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(Level::Warn, message, metadata);
    }
    pub fn error(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(Level::Error, message, metadata);
    }
    pub fn critical(&self, message: &str, metadata: Option<&Metadata>) {
        self.log(Level::Critical, message, metadata);
    }

    /// Best-effort variant: swallows per-sink errors (already reported via
    /// the error handler) and flushes at the end, for fire-and-forget calls
    /// on a program exit path.
    pub fn trace_lossy(&self, message: &str, metadata: Option<&Metadata>) {
        self.log_best_effort(Level::Trace, message, metadata);
    }
    pub fn debug_lossy(&self, message: &str, metadata: Option<&Metadata>) {
        self.log_best_effort(Level::Debug, message, metadata);
    }
    pub fn info_lossy(&self, message: &str, metadata: Option<&Metadata>) {
        self.log_best_effort(Level::Info, message, metadata);
    }
    pub fn warn_lossy(&self, message: &str, metadata: Option<&Metadata>) {
        self.log_best_effort(Level::Warn, message, metadata);
    }
    pub fn error_lossy(&self, message: &str, metadata: Option<&Metadata>) {
        self.log_best_effort(Level::Error, message, metadata);
    }
    pub fn critical_lossy(&self, message: &str, metadata: Option<&Metadata>) {
        self.log_best_effort(Level::Critical, message, metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as NexResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        kind: SinkKind,
        min_level: Level,
        count: Arc<AtomicUsize>,
    }

    impl Sink for CountingSink {
        fn write_structured(&mut self, _level: Level, _message: &str, _metadata: Option<&Metadata>) -> NexResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn write_preformatted(&mut self, _bytes: &[u8]) -> NexResult<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn flush(&mut self) -> NexResult<()> {
            Ok(())
        }
        fn close(&mut self) -> NexResult<()> {
            Ok(())
        }
        fn min_level(&self) -> Level {
            self.min_level
        }
        fn kind(&self) -> SinkKind {
            self.kind
        }
    }

    #[test]
    fn level_gate_drops_below_min_level() {
        let logger = Logger::new(Level::Warn, AHashMap::new()).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        logger.add_handler(Box::new(CountingSink {
            kind: SinkKind::Console,
            min_level: Level::Trace,
            count: count.clone(),
        }));
        logger.info("ignored", None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        logger.error("delivered", None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fan_out_reaches_every_sink() {
        let logger = Logger::new(Level::Trace, AHashMap::new()).unwrap();
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        logger.add_handler(Box::new(CountingSink {
            kind: SinkKind::Console,
            min_level: Level::Trace,
            count: count_a.clone(),
        }));
        logger.add_handler(Box::new(CountingSink {
            kind: SinkKind::File,
            min_level: Level::Trace,
            count: count_b.clone(),
        }));
        logger.info("hello", None);
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_handler_stops_delivery() {
        let logger = Logger::new(Level::Trace, AHashMap::new()).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let idx = logger.add_handler(Box::new(CountingSink {
            kind: SinkKind::Console,
            min_level: Level::Trace,
            count: count.clone(),
        }));
        assert!(logger.remove_handler(idx));
        logger.info("nobody home", None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!logger.remove_handler(idx));
    }

    #[test]
    fn per_sink_failure_does_not_abort_fan_out() {
        struct FailingSink;
        impl Sink for FailingSink {
            fn write_structured(&mut self, _l: Level, _m: &str, _meta: Option<&Metadata>) -> NexResult<()> {
                Ok(())
            }
            fn write_preformatted(&mut self, _bytes: &[u8]) -> NexResult<()> {
                Err(crate::error::NexlogError::Unexpected("boom".to_string()))
            }
            fn flush(&mut self) -> NexResult<()> {
                Ok(())
            }
            fn close(&mut self) -> NexResult<()> {
                Ok(())
            }
            fn min_level(&self) -> Level {
                Level::Trace
            }
            fn kind(&self) -> SinkKind {
                SinkKind::Console
            }
        }

        let logger = Logger::new(Level::Trace, AHashMap::new()).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        logger.add_handler(Box::new(FailingSink));
        logger.add_handler(Box::new(CountingSink {
            kind: SinkKind::Console,
            min_level: Level::Trace,
            count: count.clone(),
        }));
        logger.info("still reaches second sink", None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
