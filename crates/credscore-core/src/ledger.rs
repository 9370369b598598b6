//! The authoritative credit-score ledger.
//!
//! One [`CreditScoreRecord`] per subject, mutated only by principals
//! holding the Calculator role. The guarded-map write here is the single
//! atomic commit point for a score update: validation happens strictly
//! before mutation, so every error leaves the ledger untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::metadata::ScoreMetadata;
use crate::principal::{Principal, Role};
use crate::registry::AuthorizationRegistry;

/// Upper score bound, inclusive.
pub const MAX_SCORE: u16 = 1000;
/// Lower score bound, inclusive.
pub const MIN_SCORE: u16 = 0;

/// One subject's authoritative score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditScoreRecord {
    pub score: u16,
    pub is_valid: bool,
    pub last_updated_at: DateTime<Utc>,
    pub updated_by: Principal,
    /// Registry-level schema version at the time of the write, not a
    /// per-subject update counter.
    pub version: u32,
    pub metadata: ScoreMetadata,
}

/// Public read view of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInfo {
    pub score: u16,
    pub is_valid: bool,
    pub last_updated_at: DateTime<Utc>,
    pub version: u32,
}

/// Static ledger parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub version: u32,
    pub max_score: u16,
    pub min_score: u16,
}

/// Score ledger gated by an [`AuthorizationRegistry`].
#[derive(Debug)]
pub struct ScoreLedger {
    registry: Arc<AuthorizationRegistry>,
    events: Arc<EventLog>,
    state: Mutex<LedgerState>,
}

#[derive(Debug)]
struct LedgerState {
    records: HashMap<Principal, CreditScoreRecord>,
    current_version: u32,
}

impl ScoreLedger {
    /// Create an empty ledger at schema version 1.
    pub fn new(registry: Arc<AuthorizationRegistry>, events: Arc<EventLog>) -> Self {
        Self {
            registry,
            events,
            state: Mutex::new(LedgerState {
                records: HashMap::new(),
                current_version: 1,
            }),
        }
    }

    /// Upsert `subject`'s score. Calculator-only.
    ///
    /// Returns the registry-level version stamped on the record. The
    /// score bound is inclusive at both ends: 1000 is accepted, 1001 is
    /// not.
    pub fn update_credit_score(
        &self,
        caller: &Principal,
        subject: &Principal,
        score: u32,
        metadata: ScoreMetadata,
    ) -> Result<u32> {
        self.registry.require_role(caller, Role::Calculator)?;
        if score > MAX_SCORE as u32 {
            return Err(LedgerError::InvalidScore(score));
        }
        let score = score as u16;
        let now = Utc::now();

        let version = {
            let mut state = self.state.lock().unwrap();
            let version = state.current_version;
            state.records.insert(
                subject.clone(),
                CreditScoreRecord {
                    score,
                    is_valid: true,
                    last_updated_at: now,
                    updated_by: caller.clone(),
                    version,
                    metadata,
                },
            );
            version
        };

        self.events.record(LedgerEvent::ScoreUpdated {
            subject: subject.clone(),
            score,
            timestamp: now,
            version,
        });
        tracing::info!(
            event = "ledger.score_updated",
            subject = %subject,
            score = score,
            version = version,
        );
        Ok(version)
    }

    /// Mark `subject`'s score invalid without clearing it. Owner-only.
    ///
    /// The numeric score stays inspectable so history is preserved.
    pub fn invalidate_score(&self, caller: &Principal, subject: &Principal) -> Result<()> {
        self.registry.require_owner(caller)?;
        let now = Utc::now();
        {
            let mut state = self.state.lock().unwrap();
            let record = state
                .records
                .get_mut(subject)
                .ok_or_else(|| LedgerError::SubjectNotFound(subject.to_string()))?;
            record.is_valid = false;
            record.last_updated_at = now;
        }
        self.events.record(LedgerEvent::ScoreInvalidated {
            subject: subject.clone(),
            timestamp: now,
        });
        tracing::info!(event = "ledger.score_invalidated", subject = %subject);
        Ok(())
    }

    /// True iff a record exists for `subject` and is currently valid.
    pub fn has_valid_score(&self, subject: &Principal) -> bool {
        let state = self.state.lock().unwrap();
        state
            .records
            .get(subject)
            .map(|r| r.is_valid)
            .unwrap_or(false)
    }

    /// Public read view of `subject`'s record, if any.
    pub fn get_credit_score_info(&self, subject: &Principal) -> Option<ScoreInfo> {
        let state = self.state.lock().unwrap();
        state.records.get(subject).map(|r| ScoreInfo {
            score: r.score,
            is_valid: r.is_valid,
            last_updated_at: r.last_updated_at,
            version: r.version,
        })
    }

    /// Bump the registry-level schema version. Owner-only, strictly
    /// increasing.
    pub fn update_version(&self, caller: &Principal, new_version: u32) -> Result<()> {
        self.registry.require_owner(caller)?;
        let old_version = {
            let mut state = self.state.lock().unwrap();
            if new_version <= state.current_version {
                return Err(LedgerError::VersionMustIncrease {
                    current: state.current_version,
                    proposed: new_version,
                });
            }
            std::mem::replace(&mut state.current_version, new_version)
        };
        self.events.record(LedgerEvent::VersionUpdated {
            old_version,
            new_version,
        });
        Ok(())
    }

    /// Current registry-level schema version.
    pub fn current_version(&self) -> u32 {
        self.state.lock().unwrap().current_version
    }

    /// Static ledger parameters. Pure, side-effect-free.
    pub fn get_contract_info(&self) -> ContractInfo {
        ContractInfo {
            version: self.current_version(),
            max_score: MAX_SCORE,
            min_score: MIN_SCORE,
        }
    }
}
