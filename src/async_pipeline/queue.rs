//! Bounded, drop-oldest queue for log entries. `crossbeam-channel` has no
//! bounded drop-oldest variant, so this is built directly on
//! `std::sync::{Mutex, Condvar}` plus a `VecDeque`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

/// One entry moving through the async pipeline. The message is copied into
/// this owned form at push time so the caller's buffer need not outlive the
/// call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub level: crate::level::Level,
    pub message: String,
    pub metadata: Option<crate::level::Metadata>,
}

impl QueueEntry {
    /// The sentinel recognized by async handlers as a flush request rather
    /// than a record to render.
    pub const FLUSH_SENTINEL: &'static str = "__FLUSH__";

    pub fn is_flush_sentinel(&self) -> bool {
        self.message == Self::FLUSH_SENTINEL
    }

    pub fn flush() -> Self {
        QueueEntry {
            level: crate::level::Level::Info,
            message: Self::FLUSH_SENTINEL.to_string(),
            metadata: None,
        }
    }
}

/// Returned by `pop`/`try_pop` once the queue has been closed and drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

struct Inner {
    entries: VecDeque<QueueEntry>,
    closed: bool,
}

/// A mutex + condvar queue with capacity `K`. Pushing past capacity drops
/// the oldest entry (FIFO drop-oldest) and increments `dropped_count`.
pub struct BoundedQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    not_empty: Condvar,
    dropped_count: AtomicU64,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        BoundedQueue {
            capacity,
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            not_empty: Condvar::new(),
            dropped_count: AtomicU64::new(0),
        }
    }

    /// Push an entry. If the queue is at capacity, the oldest entry is
    /// dropped first and `dropped_count` is incremented.
    pub fn push(&self, entry: QueueEntry) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        if inner.entries.len() >= self.capacity {
            inner.entries.pop_front();
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
        inner.entries.push_back(entry);
        self.not_empty.notify_one();
    }

    /// Block until an entry is available or the queue is closed and empty.
    pub fn pop(&self) -> Result<QueueEntry, QueueClosed> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(entry) = inner.entries.pop_front() {
                return Ok(entry);
            }
            if inner.closed {
                return Err(QueueClosed);
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Non-blocking pop: `None` if nothing is queued right now, regardless
    /// of closed state.
    pub fn try_pop(&self) -> Option<QueueEntry> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark the queue closed and wake any blocked popper. Already-queued
    /// entries remain poppable until drained.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.not_empty.notify_all();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }
}
