//! Principals and roles.
//!
//! A [`Principal`] is an opaque identity (an address or key fingerprint,
//! depending on the deployment's wallet collaborator). The ledger never
//! inspects the id beyond rejecting the empty string — key material and
//! signing live outside this crate.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// An identity referenced by role grants and score records.
///
/// The inner field is private so every `Principal` in the system went
/// through [`Principal::new`] and is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    /// Create a principal from an id string. Rejects the empty string,
    /// the moral equivalent of the zero address.
    pub fn new(id: impl Into<String>) -> Result<Self, LedgerError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LedgerError::InvalidSubject);
        }
        Ok(Principal(id))
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a principal is allowed to do.
///
/// Closed set — there is no escape hatch. A principal may hold any
/// combination of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May write authoritative credit scores to the ledger.
    Calculator,
    /// May write score factors and submit aggregated external data.
    Oracle,
    /// May perform identity/payment verification (consumed by services
    /// outside this crate; tracked here for registry completeness).
    Verifier,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Calculator => write!(f, "calculator"),
            Role::Oracle => write!(f, "oracle"),
            Role::Verifier => write!(f, "verifier"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_rejects_empty_id() {
        assert!(matches!(
            Principal::new(""),
            Err(LedgerError::InvalidSubject)
        ));
        assert!(matches!(
            Principal::new("   "),
            Err(LedgerError::InvalidSubject)
        ));
    }

    #[test]
    fn test_principal_display_roundtrip() {
        let p = Principal::new("5Grw...utQY").unwrap();
        assert_eq!(p.to_string(), "5Grw...utQY");
        assert_eq!(p.as_str(), "5Grw...utQY");
    }

    #[test]
    fn test_role_display_covers_all_variants() {
        assert_eq!(Role::Calculator.to_string(), "calculator");
        assert_eq!(Role::Oracle.to_string(), "oracle");
        assert_eq!(Role::Verifier.to_string(), "verifier");
    }

    #[test]
    fn test_role_serde_snake_case() {
        let json = serde_json::to_string(&Role::Calculator).unwrap();
        assert_eq!(json, "\"calculator\"");
        let back: Role = serde_json::from_str("\"oracle\"").unwrap();
        assert_eq!(back, Role::Oracle);
    }
}
