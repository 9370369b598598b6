//! Worker-level error folding.
//!
//! Only genuine failures live here. Lease contention and low-confidence
//! data are normal tick outcomes, modeled on
//! [`TickOutcome`](crate::scheduler::TickOutcome) rather than as errors.

use thiserror::Error;

/// Errors a worker tick can fail with.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("ledger error: {0}")]
    Ledger(#[from] credscore_core::LedgerError),

    #[error("oracle error: {0}")]
    Oracle(#[from] credscore_oracle::OracleError),

    #[error("invalid datum: {reason}")]
    InvalidDatum { reason: String },
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
