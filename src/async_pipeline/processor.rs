//! Background worker that drains the bounded queue and fans out to a list
//! of handlers. Mirrors the buffering/periodic-flush shape of a
//! background-thread writer, generalized from a single file target to
//! `Vec<Box<dyn Sink>>`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{ErrorContext, ErrorHandler, NexlogError, Result, StderrErrorHandler};
use crate::level::{Level, Metadata};
use crate::sink::Sink;

use super::queue::{BoundedQueue, QueueClosed, QueueEntry};

/// Counters surfaced by `AsyncLogger::get_stats`.
#[derive(Debug, Default, Clone)]
pub struct AsyncStats {
    pub processed: u64,
    pub dropped: u64,
    pub handler_errors: u64,
}

struct Shared {
    queue: Arc<BoundedQueue>,
    handlers: Mutex<Vec<Box<dyn Sink>>>,
    stop_flag: AtomicBool,
    processed: AtomicU64,
    handler_errors: AtomicU64,
    error_handler: Arc<dyn ErrorHandler>,
}

/// Owns one background worker thread and the handler list it fans out to.
/// `start()` is idempotent-error: calling it twice without an intervening
/// `stop()` fails with `NexlogError::State`.
pub struct AsyncProcessor {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncProcessor {
    pub fn new(queue_capacity: usize, handlers: Vec<Box<dyn Sink>>) -> Self {
        Self::with_error_handler(queue_capacity, handlers, Arc::new(StderrErrorHandler))
    }

    pub fn with_error_handler(
        queue_capacity: usize,
        handlers: Vec<Box<dyn Sink>>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        AsyncProcessor {
            shared: Arc::new(Shared {
                queue: Arc::new(BoundedQueue::new(queue_capacity)),
                handlers: Mutex::new(handlers),
                stop_flag: AtomicBool::new(false),
                processed: AtomicU64::new(0),
                handler_errors: AtomicU64::new(0),
                error_handler,
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> &Arc<BoundedQueue> {
        &self.shared.queue
    }

    /// Start the background worker. Errors with `NexlogError::State` if
    /// already running.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap();
        if worker.is_some() {
            return Err(NexlogError::State("async processor already started".to_string()));
        }
        self.shared.stop_flag.store(false, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::spawn(move || worker_loop(shared));
        *worker = Some(handle);
        Ok(())
    }

    /// Stop sequence: raise the stop flag, close the queue (wakes the
    /// worker), join the thread, then drain any residual entries with
    /// `try_pop` so nothing acknowledged is silently discarded.
    pub fn stop(&self) -> Result<()> {
        let handle = {
            let mut worker = self.worker.lock().unwrap();
            worker.take()
        };
        self.shared.stop_flag.store(true, Ordering::SeqCst);
        self.shared.queue.close();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        let mut handlers = self.shared.handlers.lock().unwrap();
        while let Some(entry) = self.shared.queue.try_pop() {
            dispatch(&self.shared, &mut handlers, entry);
        }
        Ok(())
    }

    /// Inject a flush sentinel; async handlers forward it to their
    /// underlying `flush()` rather than rendering it.
    pub fn flush(&self) {
        self.shared.queue.push(QueueEntry::flush());
    }

    /// Poll queue size until zero or `timeout_ms` elapses, sleeping 1ms
    /// between checks.
    pub fn drain(&self, timeout_ms: u64) -> Result<()> {
        let deadline = std::time::Instant::now() + Duration::from_millis(timeout_ms);
        while !self.shared.queue.is_empty() {
            if std::time::Instant::now() >= deadline {
                return Err(NexlogError::State("drain timed out".to_string()));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    pub fn push(&self, level: Level, message: String, metadata: Option<Metadata>) {
        self.shared.queue.push(QueueEntry { level, message, metadata });
    }

    pub fn get_stats(&self) -> AsyncStats {
        AsyncStats {
            processed: self.shared.processed.load(Ordering::Relaxed),
            dropped: self.shared.queue.dropped_count(),
            handler_errors: self.shared.handler_errors.load(Ordering::Relaxed),
        }
    }
}

fn dispatch(shared: &Arc<Shared>, handlers: &mut [Box<dyn Sink>], entry: QueueEntry) {
    for handler in handlers.iter_mut() {
        let result = if entry.is_flush_sentinel() {
            handler.flush()
        } else {
            handler.write_structured(entry.level, &entry.message, entry.metadata.as_ref())
        };
        if let Err(err) = result {
            shared.handler_errors.fetch_add(1, Ordering::Relaxed);
            shared
                .error_handler
                .handle(&ErrorContext::new("AsyncHandler", err.to_string(), file!(), line!()));
        }
    }
    if !entry.is_flush_sentinel() {
        shared.processed.fetch_add(1, Ordering::Relaxed);
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        match shared.queue.pop() {
            Ok(entry) => {
                let mut handlers = shared.handlers.lock().unwrap();
                dispatch(&shared, &mut handlers, entry);
            }
            Err(QueueClosed) => break,
        }
    }
}
