//! credscore Core Library
//!
//! Score ledger, authorization registry and factor store — the state
//! machines at the heart of the credscore credit-scoring engine.

pub mod error;
pub mod events;
pub mod factors;
pub mod ledger;
pub mod metadata;
pub mod metrics;
pub mod obs;
pub mod principal;
pub mod registry;

pub use error::{LedgerError, Result};
pub use events::{EventLog, EventRecord, LedgerEvent};
pub use factors::{FactorStore, ScoreFactor, NEUTRAL_SCORE};
pub use ledger::{
    ContractInfo, CreditScoreRecord, ScoreInfo, ScoreLedger, MAX_SCORE, MIN_SCORE,
};
pub use metadata::{ScoreMetadata, METADATA_SCHEMA_VERSION};
pub use principal::{Principal, Role};
pub use registry::AuthorizationRegistry;

pub use metrics::METRICS;
pub use obs::{
    emit_lease_acquired, emit_lease_unavailable, emit_role_check_failed,
    emit_submission_committed, emit_submission_withheld, emit_tick_failed, tick_span,
};

/// credscore version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
