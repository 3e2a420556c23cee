//! Access policy for pets.

use crate::models::{Pet, Role};

use super::{personnel_or_own, AccessDecision, ActorContext, DenyReason, ListScope, Operation};

/// Decides what an actor may do with a pet.
///
/// Owners can do anything with their own pets. Veterinarians read and update
/// but never delete. Staff read and update freely, and may delete only pets
/// whose tutor is a client, so staff cannot remove pets belonging to other
/// staff or admin accounts.
pub struct PetAccess;

impl PetAccess {
    /// Object-level decision. `tutor_role` is the role of the pet's tutor,
    /// needed only for the staff delete rule.
    pub fn check(
        actor: &ActorContext,
        pet: &Pet,
        tutor_role: Option<Role>,
        op: Operation,
    ) -> AccessDecision {
        if actor.is_admin() || pet.is_owned_by(&actor.user_id) {
            return AccessDecision::Allow;
        }

        match actor.role {
            Some(Role::Veterinarian) => match op {
                Operation::List | Operation::Retrieve | Operation::Update => AccessDecision::Allow,
                Operation::Delete => AccessDecision::Deny(DenyReason::VeterinarioNoDelete),
                Operation::Create => AccessDecision::Deny(DenyReason::StaffOnly),
            },
            Some(Role::Staff) => match op {
                Operation::List
                | Operation::Retrieve
                | Operation::Create
                | Operation::Update => AccessDecision::Allow,
                Operation::Delete => {
                    if tutor_role == Some(Role::Client) {
                        AccessDecision::Allow
                    } else {
                        AccessDecision::Deny(DenyReason::FuncionarioDeleteClienteOnly)
                    }
                }
            },
            Some(Role::Client) => AccessDecision::Deny(DenyReason::NotOwner),
            Some(Role::Admin) => AccessDecision::Allow,
            None => AccessDecision::Deny(DenyReason::ProfileMissing),
        }
    }

    /// Visible scope for list operations.
    pub fn list_scope(actor: &ActorContext) -> ListScope {
        personnel_or_own(actor)
    }
}
