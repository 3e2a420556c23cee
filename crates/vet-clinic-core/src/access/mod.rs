//! Role-based access decisions.
//!
//! One policy per resource family, each a pure function from
//! (actor, ownership facts, operation) to a decision. Handlers never compare
//! role tokens directly; every rule lives here so the full matrix can be
//! table-tested.

mod appointments;
mod config;
mod pets;
mod records;

pub use appointments::*;
pub use config::*;
pub use pets::*;
pub use records::*;

use crate::models::Role;

/// The operations a policy decides over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

/// Machine-readable reason attached to a denial so callers can distinguish
/// categories without parsing prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The actor has no role record; writes fail closed.
    ProfileMissing,
    /// Veterinarians never delete pets.
    VeterinarioNoDelete,
    /// Staff may only delete pets whose tutor is a client.
    FuncionarioDeleteClienteOnly,
    /// The actor does not own the target resource.
    NotOwner,
    /// The operation is not available to clients.
    ClientForbidden,
    /// The operation is restricted to admins.
    AdminOnly,
    /// The operation is restricted to clinic personnel.
    StaffOnly,
}

impl DenyReason {
    /// Stable reason code carried to the boundary.
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::ProfileMissing => "profile_missing",
            DenyReason::VeterinarioNoDelete => "veterinario_no_delete",
            DenyReason::FuncionarioDeleteClienteOnly => "funcionario_delete_cliente_only",
            DenyReason::NotOwner => "not_owner",
            DenyReason::ClientForbidden => "client_forbidden",
            DenyReason::AdminOnly => "admin_only",
            DenyReason::StaffOnly => "staff_only",
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// An authenticated caller. `role` is `None` when the role record is
/// missing; such actors are scoped like clients and denied object-level
/// writes (fail closed, never fail open).
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: String,
    pub role: Option<Role>,
}

impl ActorContext {
    pub fn new(user_id: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_staff(&self) -> bool {
        self.role == Some(Role::Staff)
    }

    pub fn is_veterinarian(&self) -> bool {
        self.role == Some(Role::Veterinarian)
    }

    /// Admin, staff or veterinarian.
    pub fn is_personnel(&self) -> bool {
        self.is_admin() || self.is_staff() || self.is_veterinarian()
    }
}

/// How far a list operation may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// Every record.
    All,
    /// Only records owned by this user id.
    OwnedBy(String),
}

/// Personnel see everything; clients and role-less actors see their own
/// records only.
pub fn personnel_or_own(actor: &ActorContext) -> ListScope {
    if actor.is_personnel() {
        ListScope::All
    } else {
        ListScope::OwnedBy(actor.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_stable() {
        assert_eq!(DenyReason::VeterinarioNoDelete.code(), "veterinario_no_delete");
        assert_eq!(
            DenyReason::FuncionarioDeleteClienteOnly.code(),
            "funcionario_delete_cliente_only"
        );
        assert_eq!(DenyReason::ProfileMissing.code(), "profile_missing");
    }

    #[test]
    fn test_missing_role_scopes_like_client() {
        let actor = ActorContext::new("u1", None);
        assert_eq!(personnel_or_own(&actor), ListScope::OwnedBy("u1".into()));
        assert!(!actor.is_personnel());
    }

    #[test]
    fn test_personnel_scope() {
        for role in [Role::Admin, Role::Staff, Role::Veterinarian] {
            let actor = ActorContext::new("u1", Some(role));
            assert_eq!(personnel_or_own(&actor), ListScope::All);
        }
        let client = ActorContext::new("u1", Some(Role::Client));
        assert_eq!(personnel_or_own(&client), ListScope::OwnedBy("u1".into()));
    }
}
