//! Time-bounded worker leases.
//!
//! A lease is an exclusive claim on a lock key with a deadline. Deadlines
//! exist so a crashed worker cannot permanently starve its key: once
//! `now > deadline` a new acquirer succeeds even without an explicit
//! release. Contention is an expected outcome, not an error — acquisition
//! returns `Option`.
//!
//! The [`LeaseManager`] trait keeps the discipline backend-agnostic; the
//! in-process [`MemoryLeaseManager`] covers single-host deployments and
//! doubles as the test fake. Workers on multiple hosts would plug in a
//! distributed implementation behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A live claim on a lock key.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerLease {
    pub lock_key: String,
    pub holder: Uuid,
    pub deadline: DateTime<Utc>,
}

/// Acquire-with-deadline / release over some mutual-exclusion backend.
///
/// Invariant: at most one live (unexpired) lease per lock key at any
/// instant.
#[async_trait]
pub trait LeaseManager: Send + Sync {
    /// Claim `lock_key` for `ttl`. Returns `None` when a live lease
    /// already exists — callers log and skip until their next tick.
    async fn try_acquire(&self, lock_key: &str, ttl: Duration) -> Option<WorkerLease>;

    /// Release a held lease immediately. Only the holder's release has
    /// any effect; a stale holder (reclaimed after expiry) is a no-op so
    /// a late worker cannot fail its tick on cleanup.
    async fn release(&self, lease: &WorkerLease);
}

/// In-process lease manager backed by a `Mutex<HashMap>`.
#[derive(Debug, Default)]
pub struct MemoryLeaseManager {
    leases: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

impl MemoryLeaseManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently-live leases (expired entries excluded).
    pub fn live_count(&self) -> usize {
        let now = Utc::now();
        let leases = self.leases.lock().unwrap();
        leases.values().filter(|(_, deadline)| *deadline > now).count()
    }
}

#[async_trait]
impl LeaseManager for MemoryLeaseManager {
    async fn try_acquire(&self, lock_key: &str, ttl: Duration) -> Option<WorkerLease> {
        let now = Utc::now();
        let deadline = now + chrono::Duration::from_std(ttl).ok()?;
        let mut leases = self.leases.lock().unwrap();

        if let Some((_, existing_deadline)) = leases.get(lock_key) {
            if *existing_deadline > now {
                return None;
            }
            // Expired lease: reclaimable without explicit release.
        }

        let holder = Uuid::new_v4();
        leases.insert(lock_key.to_string(), (holder, deadline));
        Some(WorkerLease {
            lock_key: lock_key.to_string(),
            holder,
            deadline,
        })
    }

    async fn release(&self, lease: &WorkerLease) {
        let mut leases = self.leases.lock().unwrap();
        match leases.get(&lease.lock_key) {
            Some((holder, _)) if *holder == lease.holder => {
                leases.remove(&lease.lock_key);
            }
            Some(_) => {
                tracing::warn!(
                    event = "lease.stale_release",
                    lock_key = %lease.lock_key,
                    holder = %lease.holder,
                );
            }
            None => {}
        }
    }
}
