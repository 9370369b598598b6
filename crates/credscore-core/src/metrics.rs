//! Global atomic counters for credscore observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. on daemon shutdown or at a tick boundary).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    submissions_committed: AtomicU64,
    submissions_withheld: AtomicU64,
    ticks_skipped: AtomicU64,
    role_checks_failed: AtomicU64,
    source_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            submissions_committed: AtomicU64::new(0),
            submissions_withheld: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            role_checks_failed: AtomicU64::new(0),
            source_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_submissions_committed(&self) {
        self.submissions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_submissions_withheld(&self) {
        self.submissions_withheld.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the lease-contention skip counter.
    pub fn inc_ticks_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_role_checks_failed(&self) {
        self.role_checks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the per-source fetch failure counter.
    pub fn inc_source_failures(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (daemon shutdown, end of a tick
    /// batch) rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            submissions_committed = self.submissions_committed(),
            submissions_withheld = self.submissions_withheld(),
            ticks_skipped = self.ticks_skipped(),
            role_checks_failed = self.role_checks_failed(),
            source_failures = self.source_failures(),
        );
    }

    pub fn submissions_committed(&self) -> u64 {
        self.submissions_committed.load(Ordering::Relaxed)
    }

    pub fn submissions_withheld(&self) -> u64 {
        self.submissions_withheld.load(Ordering::Relaxed)
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped.load(Ordering::Relaxed)
    }

    pub fn role_checks_failed(&self) -> u64 {
        self.role_checks_failed.load(Ordering::Relaxed)
    }

    pub fn source_failures(&self) -> u64 {
        self.source_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.submissions_committed.store(0, Ordering::Relaxed);
        self.submissions_withheld.store(0, Ordering::Relaxed);
        self.ticks_skipped.store(0, Ordering::Relaxed);
        self.role_checks_failed.store(0, Ordering::Relaxed);
        self.source_failures.store(0, Ordering::Relaxed);
    }
}
