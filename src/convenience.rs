//! Thin pass-through free functions over a process-scoped default logger.
//! Deliberately not macros: every call here is a plain function, so callers
//! that want file/line capture do it themselves via `Metadata::with_location`.

use once_cell::sync::OnceCell;

use crate::config::LoggerConfig;
use crate::level::Metadata;
use crate::logger::Logger;

static DEFAULT_LOGGER: OnceCell<Logger> = OnceCell::new();

fn merge_thread_context(metadata: Option<Metadata>) -> Option<Metadata> {
    let metadata = metadata.unwrap_or_default();
    match (metadata.context.clone(), crate::context::get()) {
        (Some(explicit), _) => Some(metadata.with_context(explicit)),
        (None, Some(ambient)) => Some(metadata.with_context(ambient)),
        (None, None) => Some(metadata),
    }
}

/// Initialize the process-wide default logger. Errors if already
/// initialized.
pub fn init(config: LoggerConfig) -> crate::error::Result<()> {
    let logger = config.build(ahash::AHashMap::new())?;
    DEFAULT_LOGGER
        .set(logger)
        .map_err(|_| crate::error::NexlogError::State("default logger already initialized".to_string()))
}

fn default_logger() -> &'static Logger {
    DEFAULT_LOGGER.get_or_init(|| {
        LoggerConfig::default()
            .build(ahash::AHashMap::new())
            .expect("default LoggerConfig must build a valid console-only logger")
    })
}

pub fn log(level: crate::level::Level, message: &str, metadata: Option<Metadata>) {
    default_logger().log(level, message, merge_thread_context(metadata).as_ref());
}

pub fn trace(message: &str) {
    log(crate::level::Level::Trace, message, None);
}
pub fn debug(message: &str) {
    log(crate::level::Level::Debug, message, None);
}
pub fn info(message: &str) {
    log(crate::level::Level::Info, message, None);
}
pub fn warn(message: &str) {
    log(crate::level::Level::Warn, message, None);
}
pub fn error(message: &str) {
    log(crate::level::Level::Error, message, None);
}
pub fn critical(message: &str) {
    log(crate::level::Level::Critical, message, None);
}

pub fn flush() {
    default_logger().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_logger_is_lazily_built_and_reusable() {
        info("hello from convenience");
        flush();
    }

    #[test]
    fn ambient_context_is_merged_in() {
        crate::context::clear();
        crate::context::add_correlation("corr-99");
        info("with ambient context");
        crate::context::clear();
        flush();
    }
}
