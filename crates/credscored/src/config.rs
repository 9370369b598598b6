//! Daemon configuration.
//!
//! One JSON file describes the whole deployment: the owner and worker
//! principals, and every data domain with its sources, cadence and
//! confidence floor. Domain scheduling fields reuse
//! [`DomainConfig`](credscore_worker::DomainConfig) directly so the file
//! and the scheduler can never drift apart.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use credscore_oracle::{HttpSource, OracleSource, ResponseParser};
use credscore_worker::DomainConfig;

const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 5_000;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Principal that owns the registry and ledger.
    pub owner: String,
    /// Principal the workers submit factors as; granted the Oracle role
    /// at startup.
    pub worker_principal: String,
    pub domains: Vec<DomainSpec>,
}

/// One data domain: scheduling parameters plus its source endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSpec {
    #[serde(flatten)]
    pub worker: DomainConfig,
    pub sources: Vec<SourceSpec>,
}

/// One HTTP source endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
    /// RFC 6901 pointer into the response body; whole body when omitted.
    #[serde(default)]
    pub pointer: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_SOURCE_TIMEOUT_MS
}

impl DaemonConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: DaemonConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.owner.trim().is_empty(), "owner must not be empty");
        anyhow::ensure!(
            !self.worker_principal.trim().is_empty(),
            "worker_principal must not be empty"
        );
        anyhow::ensure!(!self.domains.is_empty(), "at least one domain is required");

        let mut lock_keys = std::collections::HashSet::new();
        for domain in &self.domains {
            let name = &domain.worker.name;
            anyhow::ensure!(
                !domain.sources.is_empty(),
                "domain {name}: at least one source is required"
            );
            anyhow::ensure!(
                domain.worker.period_secs > 0,
                "domain {name}: period_secs must be positive"
            );
            anyhow::ensure!(
                domain.worker.lease_ttl_secs > 0,
                "domain {name}: lease_ttl_secs must be positive"
            );
            anyhow::ensure!(
                (0.0..=1.0).contains(&domain.worker.confidence_floor),
                "domain {name}: confidence_floor must be within 0.0..=1.0"
            );
            anyhow::ensure!(
                domain.worker.factor_weight <= 100,
                "domain {name}: factor_weight must be at most 100"
            );
            anyhow::ensure!(
                lock_keys.insert(domain.worker.lock_key.clone()),
                "domain {name}: duplicate lock_key {}",
                domain.worker.lock_key
            );
        }
        Ok(())
    }
}

impl SourceSpec {
    /// Build the HTTP source for this endpoint, sharing the daemon's client.
    pub fn build(&self, client: &reqwest::Client) -> Arc<dyn OracleSource> {
        let parser = match &self.pointer {
            Some(pointer) => ResponseParser::Pointer {
                pointer: pointer.clone(),
            },
            None => ResponseParser::Raw,
        };
        let mut source = HttpSource::new(
            client.clone(),
            &self.name,
            &self.url,
            parser,
            Duration::from_millis(self.timeout_ms),
        );
        for (key, value) in &self.headers {
            source = source.with_header(key, value);
        }
        Arc::new(source)
    }
}

impl DomainSpec {
    /// Longest per-source timeout in this domain; the aggregator's outer
    /// timeout must not undercut any source's own budget.
    pub fn max_source_timeout(&self) -> Duration {
        let ms = self
            .sources
            .iter()
            .map(|s| s.timeout_ms)
            .max()
            .unwrap_or(DEFAULT_SOURCE_TIMEOUT_MS);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use credscore_worker::FetchStrategy;

    fn sample_json() -> String {
        serde_json::json!({
            "owner": "credscore-admin",
            "worker_principal": "worker-oracle",
            "domains": [
                {
                    "name": "exchange_rates",
                    "lock_key": "oracle_exchange_rate::lock",
                    "data_key": "usd_brl",
                    "period_secs": 300,
                    "lease_ttl_secs": 300,
                    "confidence_floor": 0.5,
                    "fetch": {"type": "fan_out"},
                    "subject": "aggregate::exchange_rates",
                    "factor_name": "fx_stability",
                    "factor_weight": 15,
                    "sources": [
                        {
                            "name": "awesomeapi",
                            "url": "https://economia.awesomeapi.com.br/json/last/USD-BRL",
                            "pointer": "/USDBRL/bid"
                        },
                        {
                            "name": "exchangerate-api",
                            "url": "https://api.exchangerate-api.com/v4/latest/USD",
                            "pointer": "/rates/BRL",
                            "timeout_ms": 8000,
                            "headers": {"x-api-key": "test"}
                        }
                    ]
                },
                {
                    "name": "compliance",
                    "lock_key": "oracle_compliance::lock",
                    "data_key": "lgpd_compliance",
                    "period_secs": 900,
                    "lease_ttl_secs": 900,
                    "confidence_floor": 0.6,
                    "fetch": {
                        "type": "fallback",
                        "primary": "monitor-a",
                        "fallbacks": ["monitor-b"]
                    },
                    "subject": "aggregate::compliance",
                    "factor_name": "lgpd_compliance",
                    "factor_weight": 20,
                    "sources": [
                        {"name": "monitor-a", "url": "https://compliance.example/a"},
                        {"name": "monitor-b", "url": "https://compliance.example/b"}
                    ]
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_load_full_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let config = DaemonConfig::load(file.path()).unwrap();
        assert_eq!(config.owner, "credscore-admin");
        assert_eq!(config.domains.len(), 2);

        let fx = &config.domains[0];
        assert_eq!(fx.worker.fetch, FetchStrategy::FanOut);
        assert_eq!(fx.sources[0].timeout_ms, DEFAULT_SOURCE_TIMEOUT_MS);
        assert_eq!(fx.sources[1].timeout_ms, 8000);
        assert_eq!(fx.max_source_timeout(), Duration::from_millis(8000));

        let compliance = &config.domains[1];
        assert!(matches!(
            compliance.worker.fetch,
            FetchStrategy::Fallback { .. }
        ));
        assert_eq!(compliance.worker.period_secs, 900);
    }

    #[test]
    fn test_rejects_empty_domains() {
        let raw = serde_json::json!({
            "owner": "o",
            "worker_principal": "w",
            "domains": []
        });
        let config: DaemonConfig = serde_json::from_value(raw).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_lock_keys() {
        let mut config: DaemonConfig =
            serde_json::from_str(&sample_json()).unwrap();
        config.domains[1].worker.lock_key = config.domains[0].worker.lock_key.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_confidence_floor() {
        let mut config: DaemonConfig =
            serde_json::from_str(&sample_json()).unwrap();
        config.domains[0].worker.confidence_floor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_overweight_factor() {
        let mut config: DaemonConfig =
            serde_json::from_str(&sample_json()).unwrap();
        config.domains[0].worker.factor_weight = 150;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_a_context_error() {
        let err = DaemonConfig::load(Path::new("/nonexistent/credscored.json")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
