//! Structured observability hooks for worker and ledger state transitions.
//!
//! This module provides:
//! - Domain-scoped tracing spans via [`tick_span`]
//! - Emission functions for the transitions an operator cares about:
//!   lease acquired/skipped, submission committed/withheld, role check failed
//!
//! Events are emitted at `info!`/`warn!` level; set `RUST_LOG` to filter.

use tracing::{info, warn, Span};

/// Span covering one worker tick, tagged with the data domain.
///
/// Attach with `tracing::Instrument` rather than an entered guard: tick
/// futures cross `.await` points and are spawned onto the multi-threaded
/// runtime, so they must stay `Send`.
pub fn tick_span(domain: &str) -> Span {
    tracing::info_span!("credscore.tick", domain = %domain)
}

/// Emit event: a worker acquired its lease for this tick.
pub fn emit_lease_acquired(domain: &str, lock_key: &str, ttl_secs: u64) {
    info!(event = "lease.acquired", domain = %domain, lock_key = %lock_key, ttl_secs = ttl_secs);
}

/// Emit event: the lease was held elsewhere; tick skipped. Normal, not an error.
pub fn emit_lease_unavailable(domain: &str, lock_key: &str) {
    info!(event = "lease.unavailable", domain = %domain, lock_key = %lock_key);
}

/// Emit event: a datum was submitted to the ledger/factor store.
pub fn emit_submission_committed(domain: &str, key: &str, source_count: u32, confidence: f64) {
    info!(
        event = "submission.committed",
        domain = %domain,
        key = %key,
        source_count = source_count,
        confidence = confidence,
    );
}

/// Emit event: submission withheld (low confidence or invalid datum).
pub fn emit_submission_withheld(domain: &str, key: &str, reason: &str, confidence: f64) {
    warn!(
        event = "submission.withheld",
        domain = %domain,
        key = %key,
        reason = %reason,
        confidence = confidence,
    );
}

/// Emit event: a role or ownership check rejected a caller.
pub fn emit_role_check_failed(principal: &str, required: &str) {
    warn!(event = "auth.check_failed", principal = %principal, required = %required);
}

/// Emit event: a tick failed outright (all sources down, ledger rejection).
pub fn emit_tick_failed(domain: &str, error: &dyn std::fmt::Display) {
    warn!(event = "tick.failed", domain = %domain, error = %error);
}
