//! Global atomic counters for enrollment outcomes.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a CLI command finishes).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    enrollments_committed: AtomicU64,
    drops_committed: AtomicU64,
    eligibility_rejections: AtomicU64,
    capacity_conflicts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            enrollments_committed: AtomicU64::new(0),
            drops_committed: AtomicU64::new(0),
            eligibility_rejections: AtomicU64::new(0),
            capacity_conflicts: AtomicU64::new(0),
        }
    }

    pub fn inc_enrollments(&self) {
        self.enrollments_committed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "enrollments_committed", "counter incremented");
    }

    pub fn inc_drops(&self) {
        self.drops_committed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "drops_committed", "counter incremented");
    }

    pub fn inc_rejections(&self) {
        self.eligibility_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "eligibility_rejections", "counter incremented");
    }

    pub fn inc_capacity_conflicts(&self) {
        self.capacity_conflicts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "capacity_conflicts", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            enrollments_committed = self.enrollments_committed(),
            drops_committed = self.drops_committed(),
            eligibility_rejections = self.eligibility_rejections(),
            capacity_conflicts = self.capacity_conflicts(),
        );
    }

    pub fn enrollments_committed(&self) -> u64 {
        self.enrollments_committed.load(Ordering::Relaxed)
    }

    pub fn drops_committed(&self) -> u64 {
        self.drops_committed.load(Ordering::Relaxed)
    }

    pub fn eligibility_rejections(&self) -> u64 {
        self.eligibility_rejections.load(Ordering::Relaxed)
    }

    pub fn capacity_conflicts(&self) -> u64 {
        self.capacity_conflicts.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.enrollments_committed.store(0, Ordering::Relaxed);
        self.drops_committed.store(0, Ordering::Relaxed);
        self.eligibility_rejections.store(0, Ordering::Relaxed);
        self.capacity_conflicts.store(0, Ordering::Relaxed);
    }
}
