//! Access policy for medical records.

use crate::models::Role;

use super::{personnel_or_own, AccessDecision, ActorContext, DenyReason, ListScope, Operation};

/// Decides what an actor may do with a medical record.
///
/// Clinical writes belong to personnel; clients never author or edit
/// records, not even for their own pets, but may read those of pets they
/// own. Deleting records is admin-only to keep the audit trail intact.
pub struct RecordAccess;

impl RecordAccess {
    /// Object-level decision. `pet_tutor_id` is the tutor of the record's
    /// pet.
    pub fn check(actor: &ActorContext, pet_tutor_id: &str, op: Operation) -> AccessDecision {
        if actor.is_admin() {
            return AccessDecision::Allow;
        }

        match op {
            Operation::List | Operation::Retrieve => match actor.role {
                Some(Role::Staff) | Some(Role::Veterinarian) | Some(Role::Admin) => {
                    AccessDecision::Allow
                }
                Some(Role::Client) | None => {
                    if actor.user_id == pet_tutor_id {
                        AccessDecision::Allow
                    } else {
                        AccessDecision::Deny(DenyReason::NotOwner)
                    }
                }
            },
            Operation::Create | Operation::Update => match actor.role {
                Some(Role::Staff) | Some(Role::Veterinarian) | Some(Role::Admin) => {
                    AccessDecision::Allow
                }
                Some(Role::Client) => AccessDecision::Deny(DenyReason::ClientForbidden),
                None => AccessDecision::Deny(DenyReason::ProfileMissing),
            },
            Operation::Delete => AccessDecision::Deny(DenyReason::AdminOnly),
        }
    }

    /// Visible scope for list operations.
    pub fn list_scope(actor: &ActorContext) -> ListScope {
        personnel_or_own(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_cannot_write_even_own_pet() {
        let actor = ActorContext::new("u1", Some(Role::Client));
        assert_eq!(
            RecordAccess::check(&actor, "u1", Operation::Create),
            AccessDecision::Deny(DenyReason::ClientForbidden)
        );
        assert_eq!(
            RecordAccess::check(&actor, "u1", Operation::Update),
            AccessDecision::Deny(DenyReason::ClientForbidden)
        );
    }

    #[test]
    fn test_client_reads_own_pets_records() {
        let actor = ActorContext::new("u1", Some(Role::Client));
        assert!(RecordAccess::check(&actor, "u1", Operation::Retrieve).is_allowed());
        assert_eq!(
            RecordAccess::check(&actor, "u2", Operation::Retrieve),
            AccessDecision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn test_personnel_write() {
        for role in [Role::Admin, Role::Staff, Role::Veterinarian] {
            let actor = ActorContext::new("p1", Some(role));
            assert!(RecordAccess::check(&actor, "u2", Operation::Create).is_allowed());
            assert!(RecordAccess::check(&actor, "u2", Operation::Update).is_allowed());
        }
    }

    #[test]
    fn test_delete_is_admin_only() {
        for role in [Role::Staff, Role::Veterinarian, Role::Client] {
            let actor = ActorContext::new("u1", Some(role));
            assert_eq!(
                RecordAccess::check(&actor, "u1", Operation::Delete),
                AccessDecision::Deny(DenyReason::AdminOnly)
            );
        }
        let admin = ActorContext::new("a1", Some(Role::Admin));
        assert!(RecordAccess::check(&admin, "u1", Operation::Delete).is_allowed());
    }
}
