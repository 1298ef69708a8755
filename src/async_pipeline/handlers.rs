//! Async-side handler aliases.
//!
//! `ConsoleSink` and `FileSink` already implement [`Sink`] end to end
//! (including the `write_structured` path the async worker calls), so the
//! async handlers are the same types used synchronously — no separate
//! "async" implementation is needed. These aliases exist so call sites can
//! name the role they play in the pipeline.

pub use crate::sink::{ConsoleSink, FileSink};
