//! Error types for oracle aggregation.

use thiserror::Error;

/// Errors that can occur while fetching and fusing external data.
///
/// The failing source is carried as `source_name`, not `source`, which
/// thiserror reserves for error-chain causes.
#[derive(Error, Debug)]
pub enum OracleError {
    /// A single source failed. Recovered locally by the aggregator's
    /// partial tolerance; only escalates when every source fails.
    #[error("source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// A source exceeded its per-request timeout.
    #[error("source {source_name} timed out after {ms}ms")]
    Timeout { source_name: String, ms: u64 },

    /// A source responded but the payload did not parse.
    #[error("source {source_name} returned malformed data: {reason}")]
    MalformedResponse { source_name: String, reason: String },

    /// A fallback chain named a source the aggregator does not know.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// Every source in a fan-out failed; the caller skips this cycle.
    #[error("all {attempted} sources failed for key {key}")]
    AllSourcesFailed { key: String, attempted: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
