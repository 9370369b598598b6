//! credscore Oracle Library
//!
//! Multi-source data aggregation: fan-out fetch with partial tolerance,
//! confidence-weighted fusion and fallback chains.

pub mod aggregator;
pub mod error;
pub mod source;

pub use aggregator::{confidence_score, OracleAggregator, OracleDatum, SourceStatus};
pub use error::{OracleError, Result};
pub use source::{HttpSource, OracleSource, ResponseParser, SourceResponse};
