//! Full pipeline: oracle fan-out through leased workers into the factor
//! store, scored on the core side.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use credscore_core::{AuthorizationRegistry, EventLog, FactorStore, Principal, NEUTRAL_SCORE};
use credscore_oracle::{OracleAggregator, OracleError, OracleSource, SourceResponse};
use credscore_worker::{
    DomainConfig, DomainWorker, FetchStrategy, LeaseManager, MemoryLeaseManager, TickOutcome,
};

struct FixedSource {
    name: &'static str,
    value: f64,
}

#[async_trait]
impl OracleSource for FixedSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self) -> credscore_oracle::Result<SourceResponse> {
        Ok(SourceResponse {
            source: self.name.to_string(),
            value: serde_json::json!(self.value),
            timestamp: Utc::now(),
        })
    }
}

struct DownSource(&'static str);

#[async_trait]
impl OracleSource for DownSource {
    fn name(&self) -> &str {
        self.0
    }

    async fn fetch(&self) -> credscore_oracle::Result<SourceResponse> {
        Err(OracleError::SourceUnavailable {
            source_name: self.0.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

struct Rig {
    factors: Arc<FactorStore>,
    leases: Arc<MemoryLeaseManager>,
    worker_principal: Principal,
}

fn rig() -> Rig {
    let events = Arc::new(EventLog::new());
    let owner = Principal::new("credscore-admin").unwrap();
    let registry = Arc::new(AuthorizationRegistry::new(
        owner.clone(),
        Arc::clone(&events),
    ));
    let worker_principal = Principal::new("worker-oracle").unwrap();
    registry
        .authorize_oracle(&owner, &worker_principal)
        .unwrap();
    Rig {
        factors: Arc::new(FactorStore::new(registry, events)),
        leases: Arc::new(MemoryLeaseManager::new()),
        worker_principal,
    }
}

fn domain(name: &str, subject: &str, factor: &str, weight: u32) -> DomainConfig {
    DomainConfig {
        name: name.to_string(),
        lock_key: format!("oracle_{name}::lock"),
        data_key: name.to_string(),
        period_secs: 300,
        lease_ttl_secs: 300,
        confidence_floor: 0.5,
        fetch: FetchStrategy::FanOut,
        subject: subject.to_string(),
        factor_name: factor.to_string(),
        factor_weight: weight,
    }
}

fn worker(r: &Rig, cfg: DomainConfig, sources: Vec<Arc<dyn OracleSource>>) -> DomainWorker {
    let aggregator = Arc::new(OracleAggregator::new(sources, Duration::from_millis(200)));
    DomainWorker::new(
        cfg,
        aggregator,
        r.leases.clone(),
        Arc::clone(&r.factors),
        r.worker_principal.clone(),
    )
    .unwrap()
}

#[tokio::test]
async fn two_domains_tick_independently_and_feed_one_subject() {
    let r = rig();
    let subject = "user-42";

    let fx = worker(
        &r,
        domain("exchange_rates", subject, "fx_stability", 40),
        vec![
            Arc::new(FixedSource {
                name: "awesomeapi",
                value: 90.0,
            }),
            Arc::new(FixedSource {
                name: "exchangerate-api",
                value: 90.0,
            }),
        ],
    );
    let compliance = worker(
        &r,
        domain("compliance", subject, "lgpd_compliance", 30),
        vec![Arc::new(FixedSource {
            name: "monitor",
            value: 80.0,
        })],
    );

    assert!(matches!(fx.tick().await, TickOutcome::Committed { .. }));
    assert!(matches!(
        compliance.tick().await,
        TickOutcome::Committed { .. }
    ));

    let subject = Principal::new(subject).unwrap();
    let factors = r.factors.get_score_factors(&subject);
    assert_eq!(factors.len(), 2);

    // (40*90 + 30*80) * 10 / 70 = 857
    assert_eq!(r.factors.calculate_score(&subject), 857);
}

#[tokio::test]
async fn partial_source_failure_still_commits() {
    let r = rig();
    let w = worker(
        &r,
        domain("crypto", "aggregate::crypto", "crypto_volatility", 10),
        vec![
            Arc::new(DownSource("coingecko")),
            Arc::new(FixedSource {
                name: "binance",
                value: 65.0,
            }),
        ],
    );

    match w.tick().await {
        TickOutcome::Committed {
            source_count,
            confidence,
        } => {
            assert_eq!(source_count, 1, "only the live source contributes");
            assert!(confidence >= 0.5);
        }
        other => panic!("expected commit, got {other:?}"),
    }
}

#[tokio::test]
async fn total_outage_leaves_score_neutral() {
    let r = rig();
    let w = worker(
        &r,
        domain("crypto", "aggregate::crypto", "crypto_volatility", 10),
        vec![Arc::new(DownSource("a")), Arc::new(DownSource("b"))],
    );

    assert!(matches!(w.tick().await, TickOutcome::Failed(_)));

    let subject = Principal::new("aggregate::crypto").unwrap();
    assert_eq!(r.factors.calculate_score(&subject), NEUTRAL_SCORE);
}

#[tokio::test]
async fn contended_domain_skips_while_others_proceed() {
    let r = rig();
    let fx = worker(
        &r,
        domain("exchange_rates", "s", "fx_stability", 40),
        vec![Arc::new(FixedSource {
            name: "api",
            value: 50.0,
        })],
    );
    let compliance = worker(
        &r,
        domain("compliance", "s", "lgpd_compliance", 30),
        vec![Arc::new(FixedSource {
            name: "monitor",
            value: 70.0,
        })],
    );

    // Another host holds the exchange-rate lock.
    let held = r
        .leases
        .try_acquire("oracle_exchange_rates::lock", Duration::from_secs(300))
        .await
        .unwrap();

    assert!(matches!(fx.tick().await, TickOutcome::SkippedLeaseHeld));
    assert!(matches!(
        compliance.tick().await,
        TickOutcome::Committed { .. }
    ));

    r.leases.release(&held).await;
    assert!(matches!(fx.tick().await, TickOutcome::Committed { .. }));
}

#[tokio::test]
async fn repeated_ticks_overwrite_rather_than_accumulate() {
    let r = rig();
    let w = worker(
        &r,
        domain("compliance", "aggregate::compliance", "lgpd_compliance", 20),
        vec![Arc::new(FixedSource {
            name: "monitor",
            value: 88.0,
        })],
    );

    for _ in 0..3 {
        assert!(matches!(w.tick().await, TickOutcome::Committed { .. }));
    }

    let subject = Principal::new("aggregate::compliance").unwrap();
    let factors = r.factors.get_score_factors(&subject);
    assert_eq!(factors.len(), 1, "same factor name is last-write-wins");
    assert_eq!(factors[0].value, 88);
}
