//! Domain-level error taxonomy for the score ledger and registry.
//!
//! Every mutating entry point validates strictly before touching state, so
//! any error here implies the ledger is unchanged.

use crate::principal::Role;

/// Errors produced by the ledger, registry and factor store.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Caller lacks the required role or ownership. Never retried
    /// automatically; surfaced to the caller as-is.
    #[error("unauthorized: {principal} lacks {required}")]
    Unauthorized { principal: String, required: String },

    #[error("score must be between 0 and 1000, got {0}")]
    InvalidScore(u32),

    #[error("factor weight must be between 0 and 100, got {0}")]
    InvalidWeight(u32),

    #[error("factor value must be between 0 and 100, got {0}")]
    InvalidFactorValue(u32),

    #[error("subject must be a non-empty principal")]
    InvalidSubject,

    #[error("no score record for subject: {0}")]
    SubjectNotFound(String),

    #[error("version must increase: current {current}, proposed {proposed}")]
    VersionMustIncrease { current: u32, proposed: u32 },
}

impl LedgerError {
    /// Convenience constructor for a missing-role failure.
    pub fn missing_role(principal: &crate::principal::Principal, role: Role) -> Self {
        LedgerError::Unauthorized {
            principal: principal.to_string(),
            required: format!("{role} role"),
        }
    }

    /// Convenience constructor for an owner-only failure.
    pub fn not_owner(principal: &crate::principal::Principal) -> Self {
        LedgerError::Unauthorized {
            principal: principal.to_string(),
            required: "ownership".to_string(),
        }
    }
}

/// Result type for ledger domain operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
