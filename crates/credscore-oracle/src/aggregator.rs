//! Fan-out aggregation with partial tolerance, confidence scoring and
//! fallback chains.
//!
//! The aggregator issues all source requests concurrently with a
//! per-source timeout. Sources that error or time out are dropped for
//! this pass (retries, if any, belong to the next scheduled cycle).
//! Aggregation fails only when zero sources respond — a
//! degraded-confidence result beats no result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use credscore_core::METRICS;

use crate::error::{OracleError, Result};
use crate::source::{OracleSource, SourceResponse};

/// Confidence contribution for a freshest response younger than one hour.
const FRESHNESS_BONUS_RECENT: f64 = 0.2;
/// Confidence contribution for a freshest response younger than a day.
const FRESHNESS_BONUS_DAY: f64 = 0.1;

/// One fused reading for a logical key. Ephemeral — not persisted beyond
/// the submission that consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleDatum {
    pub key: String,
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// How many sources responded in this pass.
    pub source_count: u32,
    /// Aggregation reliability in [0,1] — source count plus freshness,
    /// not a statistical probability.
    pub confidence: f64,
    /// Set when confidence < 0.5. Flagged, never silently dropped;
    /// downstream submission logic decides whether to proceed.
    pub degraded: bool,
}

impl OracleDatum {
    /// Whether the datum carries everything a submission needs.
    pub fn is_well_formed(&self) -> bool {
        !self.key.is_empty() && !self.value.is_null()
    }
}

/// Health probe result for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatus {
    pub name: String,
    pub reachable: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Compute the confidence score for an aggregation pass.
///
/// Monotonically non-decreasing in `source_count` (holding freshness
/// fixed) and in freshness (holding `source_count` fixed):
/// base 0.5, up to +0.3 scaled by `min(count,3)/3`, +0.2 when the
/// freshest response is under an hour old (+0.1 under a day), capped
/// at 1.0. Anything older than a day earns no freshness bonus and the
/// caller should treat the datum as stale.
pub fn confidence_score(source_count: u32, freshest_age: chrono::Duration) -> f64 {
    let mut confidence = 0.5;
    confidence += 0.3 * (source_count.min(3) as f64) / 3.0;
    if freshest_age < chrono::Duration::hours(1) {
        confidence += FRESHNESS_BONUS_RECENT;
    } else if freshest_age < chrono::Duration::hours(24) {
        confidence += FRESHNESS_BONUS_DAY;
    }
    confidence.min(1.0)
}

/// Multi-source aggregator for one data domain.
///
/// Source order matters: the first configured source that responds
/// supplies the representative value for a fan-out pass.
pub struct OracleAggregator {
    sources: Vec<Arc<dyn OracleSource>>,
    per_source_timeout: Duration,
}

impl OracleAggregator {
    pub fn new(sources: Vec<Arc<dyn OracleSource>>, per_source_timeout: Duration) -> Self {
        Self {
            sources,
            per_source_timeout,
        }
    }

    /// Configured source names, in priority order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Fetch one source with the aggregator's timeout applied.
    async fn fetch_one(&self, source: &Arc<dyn OracleSource>) -> Result<SourceResponse> {
        let timeout_ms = self.per_source_timeout.as_millis() as u64;
        match tokio::time::timeout(self.per_source_timeout, source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                source_name: source.name().to_string(),
                ms: timeout_ms,
            }),
        }
    }

    /// Fan-out fetch across every configured source, fusing the responses
    /// into a single [`OracleDatum`] for `key`.
    ///
    /// Partial tolerance: failed sources are logged and dropped; the pass
    /// fails only if all of them fail, with [`OracleError::AllSourcesFailed`].
    pub async fn aggregate(&self, key: &str) -> Result<OracleDatum> {
        let attempted = self.sources.len();
        let fetches = self.sources.iter().map(|source| self.fetch_one(source));
        let results = join_all(fetches).await;

        // Keep responders in configured order; the first one is primary.
        let mut responses: Vec<SourceResponse> = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(response) => responses.push(response),
                Err(err) => {
                    METRICS.inc_source_failures();
                    tracing::warn!(
                        event = "oracle.source_failed",
                        key = %key,
                        source = %source.name(),
                        error = %err,
                    );
                }
            }
        }

        if responses.is_empty() {
            return Err(OracleError::AllSourcesFailed {
                key: key.to_string(),
                attempted,
            });
        }

        let now = Utc::now();
        let source_count = responses.len() as u32;
        let freshest = responses.iter().map(|r| r.timestamp).max().unwrap_or(now);
        let confidence = confidence_score(source_count, now - freshest);

        // Representative value: first configured source that responded.
        let primary = responses.remove(0);

        let datum = OracleDatum {
            key: key.to_string(),
            value: primary.value,
            timestamp: primary.timestamp,
            source_count,
            confidence,
            degraded: confidence < 0.5,
        };
        tracing::debug!(
            event = "oracle.aggregated",
            key = %key,
            source_count = source_count,
            confidence = confidence,
            primary = %primary.source,
        );
        Ok(datum)
    }

    /// Try sources in strict order, returning the first successful datum.
    ///
    /// Used when sources are mirrors of the same feed rather than
    /// mutually corroborating; `source_count` is always 1 here.
    pub async fn fetch_with_fallback(
        &self,
        key: &str,
        primary: &str,
        fallbacks: &[String],
    ) -> Result<OracleDatum> {
        let mut attempted = 0usize;
        for name in std::iter::once(primary).chain(fallbacks.iter().map(String::as_str)) {
            let source = self
                .sources
                .iter()
                .find(|s| s.name() == name)
                .ok_or_else(|| OracleError::UnknownSource(name.to_string()))?;
            attempted += 1;
            match self.fetch_one(source).await {
                Ok(response) => {
                    let now = Utc::now();
                    let confidence = confidence_score(1, now - response.timestamp);
                    return Ok(OracleDatum {
                        key: key.to_string(),
                        value: response.value,
                        timestamp: response.timestamp,
                        source_count: 1,
                        confidence,
                        degraded: confidence < 0.5,
                    });
                }
                Err(err) => {
                    METRICS.inc_source_failures();
                    tracing::warn!(
                        event = "oracle.fallback_step_failed",
                        key = %key,
                        source = %name,
                        error = %err,
                    );
                }
            }
        }
        Err(OracleError::AllSourcesFailed {
            key: key.to_string(),
            attempted,
        })
    }

    /// Probe every source once and report reachability and latency.
    pub async fn sources_status(&self) -> Vec<SourceStatus> {
        let mut statuses = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let start = std::time::Instant::now();
            let result = self.fetch_one(source).await;
            let latency_ms = start.elapsed().as_millis() as u64;
            statuses.push(SourceStatus {
                name: source.name().to_string(),
                reachable: result.is_ok(),
                latency_ms,
                error: result.err().map(|e| e.to_string()),
                checked_at: Utc::now(),
            });
        }
        statuses
    }
}
