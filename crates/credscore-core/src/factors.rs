//! Weighted scoring factors and the advisory score calculation.
//!
//! Factors are supplied by Oracle-role principals and keyed by name per
//! subject, last-write-wins. [`FactorStore::calculate_score`] derives a
//! score from the current factor set; it is advisory and deliberately
//! never auto-committed to the ledger — a Calculator-role service reads
//! it, applies its own business rules, and then calls
//! `update_credit_score` to commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::ledger::MAX_SCORE;
use crate::principal::{Principal, Role};
use crate::registry::AuthorizationRegistry;

/// Score returned for a subject with no contributing factors.
///
/// Not zero: zero would read as maximum risk for a subject we simply
/// know nothing about.
pub const NEUTRAL_SCORE: u16 = 500;

/// One weighted factor for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    /// Relative weight, 0..=100.
    pub weight: u8,
    /// Factor reading, 0..=100.
    pub value: u8,
    pub added_by: Principal,
    pub timestamp: DateTime<Utc>,
}

/// Per-subject factor store gated by an [`AuthorizationRegistry`].
#[derive(Debug)]
pub struct FactorStore {
    registry: Arc<AuthorizationRegistry>,
    events: Arc<EventLog>,
    factors: Mutex<HashMap<Principal, HashMap<String, ScoreFactor>>>,
}

impl FactorStore {
    pub fn new(registry: Arc<AuthorizationRegistry>, events: Arc<EventLog>) -> Self {
        Self {
            registry,
            events,
            factors: Mutex::new(HashMap::new()),
        }
    }

    /// Add or overwrite a factor for `subject`. Oracle-only.
    ///
    /// A factor of the same name replaces the previous one; the old
    /// reading is not kept.
    pub fn add_score_factor(
        &self,
        caller: &Principal,
        subject: &Principal,
        name: &str,
        weight: u32,
        value: u32,
    ) -> Result<()> {
        self.registry.require_role(caller, Role::Oracle)?;
        if weight > 100 {
            return Err(LedgerError::InvalidWeight(weight));
        }
        if value > 100 {
            return Err(LedgerError::InvalidFactorValue(value));
        }
        let now = Utc::now();
        let factor = ScoreFactor {
            name: name.to_string(),
            weight: weight as u8,
            value: value as u8,
            added_by: caller.clone(),
            timestamp: now,
        };
        {
            let mut factors = self.factors.lock().unwrap();
            factors
                .entry(subject.clone())
                .or_default()
                .insert(name.to_string(), factor);
        }
        self.events.record(LedgerEvent::ScoreFactorAdded {
            subject: subject.clone(),
            name: name.to_string(),
            weight: weight as u8,
            value: value as u8,
            timestamp: now,
        });
        tracing::info!(
            event = "factors.added",
            subject = %subject,
            name = name,
            weight = weight,
            value = value,
        );
        Ok(())
    }

    /// All current factors for `subject`, sorted by name for stable output.
    pub fn get_score_factors(&self, subject: &Principal) -> Vec<ScoreFactor> {
        let factors = self.factors.lock().unwrap();
        let mut out: Vec<ScoreFactor> = factors
            .get(subject)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Derive an advisory score from `subject`'s current factor set.
    ///
    /// The weighted mean of the 0–100 factor values is mapped onto the
    /// 0–1000 scale: `Σ(weight·value)·10 / Σweight`, clamped. Empty
    /// factor sets (and the all-zero-weight degenerate case) yield
    /// [`NEUTRAL_SCORE`]. Deterministic over identical factor sets.
    pub fn calculate_score(&self, subject: &Principal) -> u16 {
        let factors = self.factors.lock().unwrap();
        let Some(set) = factors.get(subject) else {
            return NEUTRAL_SCORE;
        };
        if set.is_empty() {
            return NEUTRAL_SCORE;
        }

        let mut weighted_sum: u64 = 0;
        let mut total_weight: u64 = 0;
        for factor in set.values() {
            weighted_sum += factor.weight as u64 * factor.value as u64;
            total_weight += factor.weight as u64;
        }
        if total_weight == 0 {
            return NEUTRAL_SCORE;
        }

        let scaled = weighted_sum * 10 / total_weight;
        scaled.min(MAX_SCORE as u64) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (FactorStore, Principal, Principal) {
        let events = Arc::new(EventLog::new());
        let owner = Principal::new("owner").unwrap();
        let registry = Arc::new(AuthorizationRegistry::new(
            owner.clone(),
            Arc::clone(&events),
        ));
        let oracle = Principal::new("oracle").unwrap();
        registry.authorize_oracle(&owner, &oracle).unwrap();
        let store = FactorStore::new(registry, events);
        let subject = Principal::new("subject").unwrap();
        (store, oracle, subject)
    }

    #[test]
    fn test_empty_factor_set_yields_neutral_score() {
        let (store, _oracle, subject) = setup();
        assert_eq!(store.calculate_score(&subject), 500);
    }

    #[test]
    fn test_oracle_adds_factor() {
        let (store, oracle, subject) = setup();
        store
            .add_score_factor(&oracle, &subject, "payment_history", 30, 85)
            .unwrap();

        let factors = store.get_score_factors(&subject);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].name, "payment_history");
        assert_eq!(factors[0].weight, 30);
        assert_eq!(factors[0].value, 85);
        assert_eq!(factors[0].added_by, oracle);
    }

    #[test]
    fn test_non_oracle_cannot_add_factor() {
        let (store, _oracle, subject) = setup();
        let mallory = Principal::new("mallory").unwrap();
        let err = store
            .add_score_factor(&mallory, &subject, "payment_history", 30, 85)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert!(store.get_score_factors(&subject).is_empty());
    }

    #[test]
    fn test_weight_bounds() {
        let (store, oracle, subject) = setup();
        let err = store
            .add_score_factor(&oracle, &subject, "x", 150, 50)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidWeight(150)));

        // Boundary inclusive.
        store
            .add_score_factor(&oracle, &subject, "x", 100, 50)
            .unwrap();
        assert_eq!(store.get_score_factors(&subject).len(), 1);
    }

    #[test]
    fn test_factor_value_bounds() {
        let (store, oracle, subject) = setup();
        let err = store
            .add_score_factor(&oracle, &subject, "x", 50, 101)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidFactorValue(101)));
    }

    #[test]
    fn test_same_name_overwrites() {
        let (store, oracle, subject) = setup();
        store
            .add_score_factor(&oracle, &subject, "payment_history", 40, 90)
            .unwrap();
        store
            .add_score_factor(&oracle, &subject, "payment_history", 40, 20)
            .unwrap();

        let factors = store.get_score_factors(&subject);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].value, 20);
    }

    #[test]
    fn test_weighted_scenario_lands_above_neutral() {
        let (store, oracle, subject) = setup();
        store
            .add_score_factor(&oracle, &subject, "payment_history", 40, 90)
            .unwrap();
        store
            .add_score_factor(&oracle, &subject, "credit_utilization", 30, 80)
            .unwrap();

        // (40*90 + 30*80) * 10 / 70 = 60000 / 70 = 857
        let score = store.calculate_score(&subject);
        assert_eq!(score, 857);
        assert!(score > 500 && score <= 1000);
    }

    #[test]
    fn test_calculate_is_deterministic() {
        let (store, oracle, subject) = setup();
        store
            .add_score_factor(&oracle, &subject, "a", 50, 60)
            .unwrap();
        store
            .add_score_factor(&oracle, &subject, "b", 25, 40)
            .unwrap();
        let first = store.calculate_score(&subject);
        for _ in 0..5 {
            assert_eq!(store.calculate_score(&subject), first);
        }
    }

    #[test]
    fn test_all_zero_weights_degenerate_to_neutral() {
        let (store, oracle, subject) = setup();
        store
            .add_score_factor(&oracle, &subject, "a", 0, 90)
            .unwrap();
        assert_eq!(store.calculate_score(&subject), 500);
    }

    #[test]
    fn test_maximal_factors_clamp_to_max_score() {
        let (store, oracle, subject) = setup();
        store
            .add_score_factor(&oracle, &subject, "a", 100, 100)
            .unwrap();
        assert_eq!(store.calculate_score(&subject), 1000);
    }
}
