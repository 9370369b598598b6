//! Authorization registry — who may calculate, supply data, or verify.
//!
//! The registry is the sole shared mutable gate in the system. Every
//! mutating ledger call re-checks role membership at the moment of the
//! call, so there is no stale-role-cache problem: a revocation takes
//! effect for the very next call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::{LedgerError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::obs;
use crate::principal::{Principal, Role};

/// Owner-gated registry of role grants.
///
/// Grants are idempotent and revoking an absent grant succeeds silently,
/// matching the upstream contract semantics. Only ownership transfer and
/// grant/revoke are owner-only; queries never fail.
#[derive(Debug)]
pub struct AuthorizationRegistry {
    state: Mutex<RegistryState>,
    events: Arc<EventLog>,
}

#[derive(Debug)]
struct RegistryState {
    owner: Principal,
    grants: HashMap<Principal, HashSet<Role>>,
}

impl AuthorizationRegistry {
    /// Create a registry owned by `owner`.
    pub fn new(owner: Principal, events: Arc<EventLog>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                owner,
                grants: HashMap::new(),
            }),
            events,
        }
    }

    /// Current owner.
    pub fn owner(&self) -> Principal {
        self.state.lock().unwrap().owner.clone()
    }

    /// Whether `caller` is the current owner.
    pub fn is_owner(&self, caller: &Principal) -> bool {
        self.state.lock().unwrap().owner == *caller
    }

    /// Grant `role` to `principal`. Owner-only.
    pub fn authorize(&self, caller: &Principal, role: Role, principal: &Principal) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.owner != *caller {
            obs::emit_role_check_failed(caller.as_str(), "ownership");
            return Err(LedgerError::not_owner(caller));
        }
        let inserted = state
            .grants
            .entry(principal.clone())
            .or_default()
            .insert(role);
        drop(state);
        if inserted {
            self.events.record(LedgerEvent::RoleGranted {
                principal: principal.clone(),
                role,
            });
        }
        Ok(())
    }

    /// Revoke `role` from `principal`. Owner-only; absent grants are a no-op.
    pub fn revoke(&self, caller: &Principal, role: Role, principal: &Principal) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.owner != *caller {
            obs::emit_role_check_failed(caller.as_str(), "ownership");
            return Err(LedgerError::not_owner(caller));
        }
        let removed = state
            .grants
            .get_mut(principal)
            .map(|roles| roles.remove(&role))
            .unwrap_or(false);
        drop(state);
        if removed {
            self.events.record(LedgerEvent::RoleRevoked {
                principal: principal.clone(),
                role,
            });
        }
        Ok(())
    }

    /// Pure query: does `principal` hold `role`? Never fails.
    pub fn has_role(&self, principal: &Principal, role: Role) -> bool {
        let state = self.state.lock().unwrap();
        state
            .grants
            .get(principal)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    pub fn is_calculator(&self, principal: &Principal) -> bool {
        self.has_role(principal, Role::Calculator)
    }

    pub fn is_oracle(&self, principal: &Principal) -> bool {
        self.has_role(principal, Role::Oracle)
    }

    pub fn is_verifier(&self, principal: &Principal) -> bool {
        self.has_role(principal, Role::Verifier)
    }

    // Entry-point aliases matching the external interface names.

    pub fn authorize_calculator(&self, caller: &Principal, p: &Principal) -> Result<()> {
        self.authorize(caller, Role::Calculator, p)
    }

    pub fn revoke_calculator(&self, caller: &Principal, p: &Principal) -> Result<()> {
        self.revoke(caller, Role::Calculator, p)
    }

    pub fn authorize_oracle(&self, caller: &Principal, p: &Principal) -> Result<()> {
        self.authorize(caller, Role::Oracle, p)
    }

    pub fn revoke_oracle(&self, caller: &Principal, p: &Principal) -> Result<()> {
        self.revoke(caller, Role::Oracle, p)
    }

    pub fn authorize_verifier(&self, caller: &Principal, p: &Principal) -> Result<()> {
        self.authorize(caller, Role::Verifier, p)
    }

    pub fn revoke_verifier(&self, caller: &Principal, p: &Principal) -> Result<()> {
        self.revoke(caller, Role::Verifier, p)
    }

    /// Transfer ownership in a single atomic swap.
    ///
    /// The previous owner loses all owner-only capability the moment the
    /// lock is released; there is no grace period.
    pub fn transfer_ownership(&self, caller: &Principal, new_owner: Principal) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.owner != *caller {
            obs::emit_role_check_failed(caller.as_str(), "ownership");
            return Err(LedgerError::not_owner(caller));
        }
        let previous = std::mem::replace(&mut state.owner, new_owner.clone());
        drop(state);
        self.events.record(LedgerEvent::OwnershipTransferred {
            previous_owner: previous,
            new_owner,
        });
        Ok(())
    }

    /// Require `role` on `principal`, with structured failure logging.
    pub(crate) fn require_role(&self, principal: &Principal, role: Role) -> Result<()> {
        if self.has_role(principal, role) {
            Ok(())
        } else {
            obs::emit_role_check_failed(principal.as_str(), &role.to_string());
            crate::metrics::METRICS.inc_role_checks_failed();
            Err(LedgerError::missing_role(principal, role))
        }
    }

    pub(crate) fn require_owner(&self, principal: &Principal) -> Result<()> {
        if self.is_owner(principal) {
            Ok(())
        } else {
            obs::emit_role_check_failed(principal.as_str(), "ownership");
            crate::metrics::METRICS.inc_role_checks_failed();
            Err(LedgerError::not_owner(principal))
        }
    }
}
