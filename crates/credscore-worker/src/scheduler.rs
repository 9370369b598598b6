//! Per-domain periodic workers.
//!
//! Each data domain (exchange rates, credit-score aggregates, compliance
//! summaries, ...) runs its own tick loop on its own cadence with its own
//! lock key; domains never block each other. One tick is:
//! acquire lease → fetch-and-fuse → validate → submit as an Oracle-role
//! factor write → release lease. The ledger write is the single atomic
//! commit point, so a tick that stops anywhere before it leaves no
//! partial state.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use credscore_core::{obs, FactorStore, Principal, METRICS};
use credscore_oracle::{OracleAggregator, OracleDatum};

use crate::error::WorkerError;
use crate::lease::LeaseManager;

/// How a domain fetches its datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Concurrent fan-out across all configured sources, fused with
    /// confidence scoring. For mutually corroborating sources.
    FanOut,
    /// Strict-order fallback chain, first success wins. For mirrored
    /// feeds that are not mutually corroborating.
    Fallback {
        primary: String,
        fallbacks: Vec<String>,
    },
}

/// Static configuration for one data domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Domain name, used in logs and spans.
    pub name: String,
    /// Lease lock key, e.g. "oracle_exchange_rate::lock".
    pub lock_key: String,
    /// Logical datum key submitted to the ledger side.
    pub data_key: String,
    /// Tick period.
    pub period_secs: u64,
    /// Lease time-to-live; bounds how long a crashed worker can hold the key.
    pub lease_ttl_secs: u64,
    /// Minimum confidence for submission; below it the tick is a logged
    /// degraded skip.
    pub confidence_floor: f64,
    pub fetch: FetchStrategy,
    /// Ledger subject the fused datum is recorded against.
    pub subject: String,
    /// Factor name written on each successful tick.
    pub factor_name: String,
    /// Factor weight written on each successful tick.
    pub factor_weight: u32,
}

impl DomainConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}

/// What one tick did. Contention and withheld submissions are normal
/// outcomes; only `Failed` is an actual failure.
#[derive(Debug)]
pub enum TickOutcome {
    /// Datum validated and submitted.
    Committed { confidence: f64, source_count: u32 },
    /// Lease held elsewhere; skipped until the next tick.
    SkippedLeaseHeld,
    /// Confidence below the domain floor; submission withheld.
    WithheldLowConfidence { confidence: f64 },
    /// Datum failed validation; dropped.
    WithheldInvalid { reason: String },
    /// Fetch or ledger write failed.
    Failed(WorkerError),
}

/// One domain's worker: fetches via the aggregator and submits factor
/// writes as its Oracle-role principal.
pub struct DomainWorker {
    config: DomainConfig,
    aggregator: Arc<OracleAggregator>,
    leases: Arc<dyn LeaseManager>,
    factors: Arc<FactorStore>,
    oracle_principal: Principal,
    subject: Principal,
}

impl DomainWorker {
    /// Build a worker. Fails only if the configured subject id is empty.
    pub fn new(
        config: DomainConfig,
        aggregator: Arc<OracleAggregator>,
        leases: Arc<dyn LeaseManager>,
        factors: Arc<FactorStore>,
        oracle_principal: Principal,
    ) -> Result<Self, WorkerError> {
        let subject = Principal::new(config.subject.clone()).map_err(WorkerError::Ledger)?;
        Ok(Self {
            config,
            aggregator,
            leases,
            factors,
            oracle_principal,
            subject,
        })
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Run one tick end to end.
    ///
    /// The lease is released on every exit path after acquisition; a tick
    /// that skips on contention touches nothing at all. The returned
    /// future is `Send` so the scheduler can spawn it freely.
    pub async fn tick(&self) -> TickOutcome {
        let span = obs::tick_span(&self.config.name);
        self.tick_inner().instrument(span).await
    }

    async fn tick_inner(&self) -> TickOutcome {
        let Some(lease) = self
            .leases
            .try_acquire(&self.config.lock_key, self.config.lease_ttl())
            .await
        else {
            obs::emit_lease_unavailable(&self.config.name, &self.config.lock_key);
            METRICS.inc_ticks_skipped();
            return TickOutcome::SkippedLeaseHeld;
        };
        obs::emit_lease_acquired(
            &self.config.name,
            &self.config.lock_key,
            self.config.lease_ttl_secs,
        );

        let outcome = self.fetch_validate_submit().await;
        self.leases.release(&lease).await;
        outcome
    }

    async fn fetch_validate_submit(&self) -> TickOutcome {
        let datum = match &self.config.fetch {
            FetchStrategy::FanOut => self.aggregator.aggregate(&self.config.data_key).await,
            FetchStrategy::Fallback { primary, fallbacks } => {
                self.aggregator
                    .fetch_with_fallback(&self.config.data_key, primary, fallbacks)
                    .await
            }
        };
        let datum = match datum {
            Ok(datum) => datum,
            Err(err) => {
                obs::emit_tick_failed(&self.config.name, &err);
                return TickOutcome::Failed(WorkerError::Oracle(err));
            }
        };

        if !datum.is_well_formed() {
            let reason = "datum missing key or value".to_string();
            obs::emit_submission_withheld(
                &self.config.name,
                &self.config.data_key,
                &reason,
                datum.confidence,
            );
            METRICS.inc_submissions_withheld();
            return TickOutcome::WithheldInvalid { reason };
        }

        if datum.confidence < self.config.confidence_floor {
            obs::emit_submission_withheld(
                &self.config.name,
                &self.config.data_key,
                "confidence below domain floor",
                datum.confidence,
            );
            METRICS.inc_submissions_withheld();
            return TickOutcome::WithheldLowConfidence {
                confidence: datum.confidence,
            };
        }

        let Some(value) = datum_to_factor_value(&datum) else {
            let reason = "datum value is not numeric".to_string();
            obs::emit_submission_withheld(
                &self.config.name,
                &self.config.data_key,
                &reason,
                datum.confidence,
            );
            METRICS.inc_submissions_withheld();
            return TickOutcome::WithheldInvalid { reason };
        };

        match self.factors.add_score_factor(
            &self.oracle_principal,
            &self.subject,
            &self.config.factor_name,
            self.config.factor_weight,
            value,
        ) {
            Ok(()) => {
                obs::emit_submission_committed(
                    &self.config.name,
                    &self.config.data_key,
                    datum.source_count,
                    datum.confidence,
                );
                METRICS.inc_submissions_committed();
                TickOutcome::Committed {
                    confidence: datum.confidence,
                    source_count: datum.source_count,
                }
            }
            Err(err) => {
                obs::emit_tick_failed(&self.config.name, &err);
                TickOutcome::Failed(WorkerError::Ledger(err))
            }
        }
    }
}

/// Map a fused datum onto the 0–100 factor scale.
///
/// Numeric payloads are clamped and rounded; anything non-numeric is
/// rejected (the caller withholds the submission).
fn datum_to_factor_value(datum: &OracleDatum) -> Option<u32> {
    let raw = datum.value.as_f64()?;
    if !raw.is_finite() {
        return None;
    }
    Some(raw.clamp(0.0, 100.0).round() as u32)
}

/// Spawns one independent tick loop per domain.
pub struct WorkerScheduler {
    workers: Vec<Arc<DomainWorker>>,
    shutdown_tx: watch::Sender<bool>,
}

impl WorkerScheduler {
    pub fn new(workers: Vec<Arc<DomainWorker>>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            workers,
            shutdown_tx,
        }
    }

    /// Spawn every domain loop. Each runs on its own `tokio::time::interval`
    /// with missed ticks skipped, so a slow tick never causes a backlog —
    /// worst-case latency is one extra period.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        self.workers
            .iter()
            .map(|worker| {
                let worker = Arc::clone(worker);
                let mut shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(worker.config().period());
                    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                    info!(
                        event = "worker.started",
                        domain = %worker.config().name,
                        period_secs = worker.config().period_secs,
                    );
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                let outcome = worker.tick().await;
                                tracing::debug!(
                                    event = "worker.tick_done",
                                    domain = %worker.config().name,
                                    outcome = ?outcome,
                                );
                            }
                            _ = shutdown_rx.changed() => {
                                info!(event = "worker.stopped", domain = %worker.config().name);
                                break;
                            }
                        }
                    }
                })
            })
            .collect()
    }

    /// Signal every domain loop to stop after its current tick.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
