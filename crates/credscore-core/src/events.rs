//! Observable ledger events.
//!
//! Every successful mutation appends one event to an in-process
//! [`EventLog`]. The daemon drains the log for its observability
//! collaborator; tests use it to assert exactly what happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::{Principal, Role};

/// A state transition observed on the ledger, registry or factor store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    ScoreUpdated {
        subject: Principal,
        score: u16,
        timestamp: DateTime<Utc>,
        version: u32,
    },
    ScoreInvalidated {
        subject: Principal,
        timestamp: DateTime<Utc>,
    },
    ScoreFactorAdded {
        subject: Principal,
        name: String,
        weight: u8,
        value: u8,
        timestamp: DateTime<Utc>,
    },
    VersionUpdated {
        old_version: u32,
        new_version: u32,
    },
    RoleGranted {
        principal: Principal,
        role: Role,
    },
    RoleRevoked {
        principal: Principal,
        role: Role,
    },
    OwnershipTransferred {
        previous_owner: Principal,
        new_owner: Principal,
    },
}

/// An event wrapped with its identity and emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub emitted_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// Append-only in-process event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: std::sync::Mutex<Vec<EventRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event, stamping id and emission time.
    pub fn record(&self, event: LedgerEvent) {
        let record = EventRecord {
            id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            event,
        };
        let mut events = self.events.lock().unwrap();
        events.push(record);
    }

    /// Snapshot of all recorded events, in emission order.
    pub fn all(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }

    /// Drain the log, returning everything recorded so far.
    pub fn drain(&self) -> Vec<EventRecord> {
        let mut events = self.events.lock().unwrap();
        std::mem::take(&mut *events)
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
