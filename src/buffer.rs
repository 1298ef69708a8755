//! A bounded, mutex-protected circular byte buffer with compaction and
//! health telemetry.
//!
//! The common path is a single mutex acquisition plus one or two memcpys;
//! compaction only runs when fragmentation crosses a threshold and a write
//! would otherwise fail, keeping contiguous writes cheap.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::BufferError;

/// Health classification returned by [`CircularBuffer::health`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// Result of a health check: overall status plus the specific issues found.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthReport {
    pub fn healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

struct Inner {
    storage: Vec<u8>,
    read: usize,
    write: usize,
    full: bool,
    last_op: Option<Instant>,
    last_compaction: Option<Instant>,
}

/// Thread-safe byte ring with compaction, overflow/underflow counters, and
/// health reporting.
pub struct CircularBuffer {
    capacity: usize,
    fragmentation_threshold_pct: u8,
    inner: Mutex<Inner>,
    total_bytes_written: AtomicU64,
    peak_usage: AtomicUsize,
    overflow_count: AtomicU64,
    underflow_count: AtomicU64,
    total_ops: AtomicU64,
    compaction_count: AtomicU64,
}

impl CircularBuffer {
    /// Creates a buffer of `capacity` bytes with the default 75% fragmentation
    /// threshold.
    pub fn new(capacity: usize) -> Self {
        Self::with_fragmentation_threshold(capacity, 75)
    }

    pub fn with_fragmentation_threshold(capacity: usize, fragmentation_threshold_pct: u8) -> Self {
        CircularBuffer {
            capacity,
            fragmentation_threshold_pct,
            inner: Mutex::new(Inner {
                storage: vec![0u8; capacity],
                read: 0,
                write: 0,
                full: false,
                last_op: None,
                last_compaction: None,
            }),
            total_bytes_written: AtomicU64::new(0),
            peak_usage: AtomicUsize::new(0),
            overflow_count: AtomicU64::new(0),
            underflow_count: AtomicU64::new(0),
            total_ops: AtomicU64::new(0),
            compaction_count: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn occupancy_locked(inner: &Inner, capacity: usize) -> usize {
        if inner.full {
            capacity
        } else if inner.write >= inner.read {
            inner.write - inner.read
        } else {
            capacity - (inner.read - inner.write)
        }
    }

    pub fn occupancy(&self) -> usize {
        let inner = self.inner.lock();
        Self::occupancy_locked(&inner, self.capacity)
    }

    pub fn available(&self) -> usize {
        self.capacity - self.occupancy()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.read == inner.write && !inner.full
    }

    /// Fragmentation percent: wrapped free bytes * 100 / capacity. Zero when
    /// the occupied region is already contiguous (or the buffer is empty).
    fn fragmentation_pct_locked(inner: &Inner, capacity: usize) -> u32 {
        if capacity == 0 {
            return 0;
        }
        // Data is wrapped iff read >= write and the buffer isn't empty; the
        // "wrapped free bytes" are the contiguous free run at the tail,
        // i.e. the segment [write..read).
        let wraps = inner.read >= inner.write && !(inner.read == inner.write && !inner.full);
        if !wraps {
            return 0;
        }
        let free_tail = inner.read - inner.write;
        (free_tail as u32 * 100) / capacity as u32
    }

    /// Relinearize wrapped data so occupied bytes start at offset 0.
    /// No-op if already contiguous.
    pub fn compact(&self) {
        let mut inner = self.inner.lock();
        self.compact_locked(&mut inner);
    }

    fn compact_locked(&self, inner: &mut Inner) {
        let wraps = inner.read >= inner.write && !(inner.read == inner.write && !inner.full);
        if !wraps {
            return;
        }
        let occupancy = Self::occupancy_locked(inner, self.capacity);
        let mut tmp = Vec::with_capacity(occupancy);
        tmp.extend_from_slice(&inner.storage[inner.read..self.capacity]);
        tmp.extend_from_slice(&inner.storage[0..inner.write]);
        inner.storage[0..occupancy].copy_from_slice(&tmp);
        inner.read = 0;
        inner.write = occupancy;
        inner.full = occupancy == self.capacity;
        inner.last_compaction = Some(Instant::now());
        self.compaction_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Write `bytes` to the buffer. Fails with `Overflow` if `bytes.len() >
    /// capacity`, or `Full` if there still isn't room after an attempted
    /// compaction. Writes never partially succeed.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, BufferError> {
        if bytes.len() > self.capacity {
            self.overflow_count.fetch_add(1, Ordering::Relaxed);
            self.total_ops.fetch_add(1, Ordering::Relaxed);
            return Err(BufferError::Overflow);
        }

        let mut inner = self.inner.lock();

        let frag = Self::fragmentation_pct_locked(&inner, self.capacity);
        let occupancy = Self::occupancy_locked(&inner, self.capacity);
        let available = self.capacity - occupancy;
        if bytes.len() > available && frag as u8 > self.fragmentation_threshold_pct {
            self.compact_locked(&mut inner);
        }

        let occupancy = Self::occupancy_locked(&inner, self.capacity);
        let available = self.capacity - occupancy;
        if bytes.len() > available {
            self.overflow_count.fetch_add(1, Ordering::Relaxed);
            self.total_ops.fetch_add(1, Ordering::Relaxed);
            return Err(BufferError::Full);
        }

        let len = bytes.len();
        let first_chunk = (self.capacity - inner.write).min(len);
        inner.storage[inner.write..inner.write + first_chunk]
            .copy_from_slice(&bytes[..first_chunk]);
        if first_chunk < len {
            let remaining = len - first_chunk;
            inner.storage[0..remaining].copy_from_slice(&bytes[first_chunk..]);
            inner.write = remaining;
        } else {
            inner.write = (inner.write + first_chunk) % self.capacity;
        }
        if inner.write == inner.read && len > 0 {
            inner.full = true;
        }
        inner.last_op = Some(Instant::now());

        self.total_bytes_written.fetch_add(len as u64, Ordering::Relaxed);
        let new_occupancy = Self::occupancy_locked(&inner, self.capacity);
        self.peak_usage.fetch_max(new_occupancy, Ordering::Relaxed);
        self.total_ops.fetch_add(1, Ordering::Relaxed);
        Ok(len)
    }

    /// Read up to `dest.len()` bytes into `dest`. Fails with `Underflow` on
    /// an empty buffer.
    pub fn read(&self, dest: &mut [u8]) -> Result<usize, BufferError> {
        let mut inner = self.inner.lock();
        let occupancy = Self::occupancy_locked(&inner, self.capacity);
        if occupancy == 0 {
            self.underflow_count.fetch_add(1, Ordering::Relaxed);
            self.total_ops.fetch_add(1, Ordering::Relaxed);
            return Err(BufferError::Underflow);
        }
        let to_read = dest.len().min(occupancy);
        let first_chunk = (self.capacity - inner.read).min(to_read);
        dest[..first_chunk].copy_from_slice(&inner.storage[inner.read..inner.read + first_chunk]);
        if first_chunk < to_read {
            let remaining = to_read - first_chunk;
            dest[first_chunk..to_read].copy_from_slice(&inner.storage[0..remaining]);
            inner.read = remaining;
        } else {
            inner.read = (inner.read + first_chunk) % self.capacity;
        }
        inner.full = false;
        inner.last_op = Some(Instant::now());
        self.total_ops.fetch_add(1, Ordering::Relaxed);
        Ok(to_read)
    }

    /// Drain the entire occupied region into an owned `Vec`, for sinks that
    /// need to hand the contiguous bytes off to a single `write_all`.
    pub fn drain_all(&self) -> Vec<u8> {
        let occupancy = self.occupancy();
        let mut out = vec![0u8; occupancy];
        if occupancy > 0 {
            let _ = self.read(&mut out);
        }
        out
    }

    pub fn total_bytes_written(&self) -> u64 {
        self.total_bytes_written.load(Ordering::Relaxed)
    }

    pub fn peak_usage(&self) -> usize {
        self.peak_usage.load(Ordering::Relaxed)
    }

    pub fn compaction_count(&self) -> u64 {
        self.compaction_count.load(Ordering::Relaxed)
    }

    /// Health check: warning at >90% usage, >5%
    /// overflow-or-underflow rate, >50% fragmentation, or >30s inactivity;
    /// critical at >95% usage.
    pub fn health(&self, now: Instant) -> HealthReport {
        let inner = self.inner.lock();
        let occupancy = Self::occupancy_locked(&inner, self.capacity);
        let usage_pct = if self.capacity == 0 {
            0.0
        } else {
            occupancy as f64 * 100.0 / self.capacity as f64
        };
        let frag_pct = Self::fragmentation_pct_locked(&inner, self.capacity);
        let total_ops = self.total_ops.load(Ordering::Relaxed);
        let bad_ops = self.overflow_count.load(Ordering::Relaxed) + self.underflow_count.load(Ordering::Relaxed);
        let error_rate_pct = if total_ops == 0 {
            0.0
        } else {
            bad_ops as f64 * 100.0 / total_ops as f64
        };
        let inactive_secs = inner
            .last_op
            .map(|t| now.saturating_duration_since(t).as_secs_f64())
            .unwrap_or(0.0);

        let mut issues = Vec::new();
        let mut status = HealthStatus::Healthy;

        if usage_pct > 95.0 {
            status = HealthStatus::Critical;
            issues.push(format!("buffer usage at {:.1}%", usage_pct));
        } else if usage_pct > 90.0 {
            status = HealthStatus::Warning;
            issues.push(format!("buffer usage at {:.1}%", usage_pct));
        }
        if error_rate_pct > 5.0 {
            if status != HealthStatus::Critical {
                status = HealthStatus::Warning;
            }
            issues.push(format!("overflow/underflow rate at {:.1}%", error_rate_pct));
        }
        if frag_pct > 50 {
            if status != HealthStatus::Critical {
                status = HealthStatus::Warning;
            }
            issues.push(format!("fragmentation at {}%", frag_pct));
        }
        if inactive_secs > 30.0 {
            if status != HealthStatus::Critical {
                status = HealthStatus::Warning;
            }
            issues.push(format!("inactive for {:.1}s", inactive_secs));
        }

        HealthReport { status, issues }
    }
}
