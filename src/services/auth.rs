use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Visibility class of the requesting actor. Every scoped query takes one of
/// these explicitly; nothing in the core reads the principal ambiently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerScope {
    /// Privileged: sees every appointment and calendar event.
    All,
    /// Sees only records keyed by this customer id.
    Own(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Employee,
    Customer,
}

/// Bearer-token claims. Token issuance lives in the identity service; this
/// backend only verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// The single capability-resolution point. Staff and employees operate on the
/// whole schedule; customers only on their own bookings.
pub fn resolve_scope(claims: &Claims) -> ViewerScope {
    match claims.role {
        Role::Staff | Role::Employee => ViewerScope::All,
        Role::Customer => ViewerScope::Own(claims.sub.clone()),
    }
}

/// Guard for catalog and ledger writes.
pub fn require_staff(claims: &Claims) -> AppResult<()> {
    match claims.role {
        Role::Staff => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

impl ViewerScope {
    /// Whether the scope covers a record owned by `customer_id`.
    pub fn covers(&self, customer_id: &str) -> bool {
        match self {
            ViewerScope::All => true,
            ViewerScope::Own(id) => id == customer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            role,
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn staff_resolves_to_all() {
        assert_eq!(resolve_scope(&claims(Role::Staff)), ViewerScope::All);
        assert_eq!(resolve_scope(&claims(Role::Employee)), ViewerScope::All);
    }

    #[test]
    fn customer_resolves_to_own() {
        let scope = resolve_scope(&claims(Role::Customer));
        assert_eq!(scope, ViewerScope::Own("user-1".to_string()));
        assert!(scope.covers("user-1"));
        assert!(!scope.covers("user-2"));
    }

    #[test]
    fn only_staff_may_write_catalog() {
        assert!(require_staff(&claims(Role::Staff)).is_ok());
        assert!(require_staff(&claims(Role::Customer)).is_err());
        assert!(require_staff(&claims(Role::Employee)).is_err());
    }
}
