//! Metrics registry for memindex
//!
//! - Counters only, monotonic
//! - Relaxed atomics: readers may observe slightly stale totals

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one feature store and its arena.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    records_committed: AtomicU64,
    bits_committed: AtomicU64,
    records_relocated: AtomicU64,
    dead_bytes_marked: AtomicU64,
    scratch_resets: AtomicU64,
    buffers_activated: AtomicU64,
    buffers_held: AtomicU64,
    buffers_freed: AtomicU64,
    held_bytes_released: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Feature store

    /// Count one committed record of `bits` bits
    pub fn record_commit(&self, bits: u64) {
        self.records_committed.fetch_add(1, Ordering::Relaxed);
        self.bits_committed.fetch_add(bits, Ordering::Relaxed);
    }

    /// Count one relocated record
    pub fn increment_relocations(&self) {
        self.records_relocated.fetch_add(1, Ordering::Relaxed);
    }

    /// Add bytes marked dead
    pub fn add_dead_bytes(&self, bytes: u64) {
        self.dead_bytes_marked.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Count one scratch window reset
    pub fn increment_scratch_resets(&self) {
        self.scratch_resets.fetch_add(1, Ordering::Relaxed);
    }

    // Buffers

    /// Count one buffer activation
    pub fn increment_buffers_activated(&self) {
        self.buffers_activated.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one buffer put on hold
    pub fn increment_buffers_held(&self) {
        self.buffers_held.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one held buffer released, with its size
    pub fn record_buffer_freed(&self, bytes: u64) {
        self.buffers_freed.fetch_add(1, Ordering::Relaxed);
        self.held_bytes_released.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_committed: self.records_committed.load(Ordering::Relaxed),
            bits_committed: self.bits_committed.load(Ordering::Relaxed),
            records_relocated: self.records_relocated.load(Ordering::Relaxed),
            dead_bytes_marked: self.dead_bytes_marked.load(Ordering::Relaxed),
            scratch_resets: self.scratch_resets.load(Ordering::Relaxed),
            buffers_activated: self.buffers_activated.load(Ordering::Relaxed),
            buffers_held: self.buffers_held.load(Ordering::Relaxed),
            buffers_freed: self.buffers_freed.load(Ordering::Relaxed),
            held_bytes_released: self.held_bytes_released.load(Ordering::Relaxed),
        }
    }

    /// Current snapshot rendered as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_committed: u64,
    pub bits_committed: u64,
    pub records_relocated: u64,
    pub dead_bytes_marked: u64,
    pub scratch_resets: u64,
    pub buffers_activated: u64,
    pub buffers_held: u64,
    pub buffers_freed: u64,
    pub held_bytes_released: u64,
}
