//! Console sink: stdout/stderr, optional ANSI colors, optional fast path.
//!
//! Writes straight to the OS stdout/stderr handle, with an ANSI color
//! table keyed on level and a fast path that skips the formatter entirely.

use std::io::{self, Write};

use crate::error::Result;
use crate::format::TemplateFormatter;
use crate::level::{Level, Metadata};

use super::{Sink, SinkKind};

/// Where a [`ConsoleSink`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

pub struct ConsoleSink {
    target: ConsoleTarget,
    min_level: Level,
    /// Bypasses `formatter` entirely and emits `[timestamp] message\n`.
    fast_mode: bool,
    formatter: TemplateFormatter,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget, min_level: Level, formatter: TemplateFormatter) -> Self {
        ConsoleSink {
            target,
            min_level,
            fast_mode: false,
            formatter,
        }
    }

    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                writeln!(lock, "{}", line)?;
            }
            ConsoleTarget::Stderr => {
                let stderr = io::stderr();
                let mut lock = stderr.lock();
                writeln!(lock, "{}", line)?;
            }
        }
        Ok(())
    }
}

impl Sink for ConsoleSink {
    fn write_structured(&mut self, level: Level, message: &str, metadata: Option<&Metadata>) -> Result<()> {
        if level < self.min_level {
            return Ok(());
        }
        if self.fast_mode {
            let timestamp = metadata
                .and_then(|m| m.timestamp)
                .unwrap_or_else(|| chrono::Utc::now().timestamp());
            self.write_line(&format!("[{}] {}", timestamp, message))
        } else {
            let rendered = self.formatter.format(level, message, metadata);
            self.write_line(&rendered)
        }
    }

    fn write_preformatted(&mut self, bytes: &[u8]) -> Result<()> {
        let rendered = String::from_utf8_lossy(bytes);
        self.write_line(rendered.trim_end_matches('\n'))
    }

    fn flush(&mut self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => io::stdout().flush()?,
            ConsoleTarget::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn min_level(&self) -> Level {
        self.min_level
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatterConfig;
    use ahash::AHashMap;

    fn make_sink() -> ConsoleSink {
        let formatter = TemplateFormatter::new(FormatterConfig::default(), AHashMap::new()).unwrap();
        ConsoleSink::new(ConsoleTarget::Stdout, Level::Info, formatter)
    }

    #[test]
    fn below_min_level_is_a_silent_no_op() {
        let mut sink = make_sink();
        assert!(sink.write_structured(Level::Debug, "hidden", None).is_ok());
    }

    #[test]
    fn fast_mode_bypasses_formatter() {
        let mut sink = make_sink().with_fast_mode(true);
        assert!(sink
            .write_structured(Level::Info, "hello", Some(&Metadata::new().with_timestamp(5)))
            .is_ok());
    }

    #[test]
    fn close_flushes() {
        let mut sink = make_sink();
        assert!(sink.close().is_ok());
    }
}
