//! credscore Worker Library
//!
//! Leased off-chain workers: per-domain tick loops that fetch fused
//! oracle data and submit it to the factor store under mutual exclusion.

pub mod error;
pub mod lease;
pub mod scheduler;

pub use error::{Result, WorkerError};
pub use lease::{LeaseManager, MemoryLeaseManager, WorkerLease};
pub use scheduler::{DomainConfig, DomainWorker, FetchStrategy, TickOutcome, WorkerScheduler};
