//! credscored - decentralized credit-scoring daemon.
//!
//! Wires the whole engine together: authorization registry and score
//! ledger owned by the configured owner principal, one oracle aggregator
//! per data domain, and a leased worker scheduler feeding fused data into
//! the factor store. Every collaborator is constructed here and injected;
//! nothing reaches for a global.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use credscore_core::{
    AuthorizationRegistry, EventLog, FactorStore, Principal, ScoreLedger, METRICS,
};
use credscore_oracle::OracleAggregator;
use credscore_worker::{DomainWorker, MemoryLeaseManager, WorkerScheduler};

use config::DaemonConfig;

#[derive(Parser)]
#[command(name = "credscored")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "credscore credit-scoring daemon", long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, env = "CREDSCORED_CONFIG", default_value = "credscored.json")]
    config: std::path::PathBuf,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs, cli.log_level);

    let config = DaemonConfig::load(&cli.config)?;
    info!(
        event = "daemon.starting",
        version = credscore_core::VERSION,
        domains = config.domains.len(),
    );

    let owner = Principal::new(config.owner.clone()).context("invalid owner principal")?;
    let worker_principal = Principal::new(config.worker_principal.clone())
        .context("invalid worker principal")?;

    let events = Arc::new(EventLog::new());
    let registry = Arc::new(AuthorizationRegistry::new(owner.clone(), Arc::clone(&events)));
    let ledger = Arc::new(ScoreLedger::new(Arc::clone(&registry), Arc::clone(&events)));
    let factors = Arc::new(FactorStore::new(Arc::clone(&registry), Arc::clone(&events)));

    registry
        .authorize_oracle(&owner, &worker_principal)
        .context("granting oracle role to worker principal")?;

    let contract = ledger.get_contract_info();
    info!(
        event = "ledger.ready",
        version = contract.version,
        max_score = contract.max_score,
    );

    let client = reqwest::Client::new();
    let leases = Arc::new(MemoryLeaseManager::new());

    let mut workers = Vec::with_capacity(config.domains.len());
    for domain in &config.domains {
        let sources = domain
            .sources
            .iter()
            .map(|spec| spec.build(&client))
            .collect();
        let aggregator = Arc::new(OracleAggregator::new(
            sources,
            domain.max_source_timeout(),
        ));
        let worker = DomainWorker::new(
            domain.worker.clone(),
            aggregator,
            leases.clone(),
            Arc::clone(&factors),
            worker_principal.clone(),
        )
        .with_context(|| format!("building worker for domain {}", domain.worker.name))?;
        workers.push(Arc::new(worker));
    }

    let scheduler = WorkerScheduler::new(workers);
    let handles = scheduler.spawn();
    info!(event = "daemon.started", workers = handles.len());

    // The in-process event log is append-only; drain it on a cadence so a
    // long-running daemon holds a bounded backlog.
    let drain_log = Arc::clone(&events);
    let drain_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            drain_events(&drain_log);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!(event = "daemon.stopping");

    scheduler.shutdown();
    for handle in handles {
        let _ = handle.await;
    }
    drain_task.abort();
    drain_events(&events);
    METRICS.flush();
    info!(event = "daemon.stopped");
    Ok(())
}

/// Move every recorded ledger event out of the log and onto the log
/// stream. Returns how many were drained.
fn drain_events(events: &EventLog) -> usize {
    let drained = events.drain();
    for record in &drained {
        tracing::debug!(
            event = "ledger.event",
            id = %record.id,
            emitted_at = %record.emitted_at,
            detail = ?record.event,
        );
    }
    drained.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use credscore_core::{LedgerEvent, Role};

    #[test]
    fn drain_events_empties_the_log() {
        let events = EventLog::new();
        for _ in 0..100 {
            events.record(LedgerEvent::RoleGranted {
                principal: Principal::new("oracle-node").unwrap(),
                role: Role::Oracle,
            });
        }

        assert_eq!(drain_events(&events), 100);
        assert!(events.is_empty(), "drained log retains nothing");
        assert_eq!(drain_events(&events), 0);
    }
}
