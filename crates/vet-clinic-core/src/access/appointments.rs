//! Access policy for appointments.

use crate::models::Role;

use super::{personnel_or_own, AccessDecision, ActorContext, DenyReason, ListScope, Operation};

/// Decides what an actor may do with an appointment.
///
/// Any authenticated actor may book, but clients only for their own pets.
/// Personnel manage the schedule; deleting booking history is admin-only.
pub struct AppointmentAccess;

impl AppointmentAccess {
    /// Decision for booking an appointment for the pet owned by
    /// `pet_tutor_id`.
    pub fn check_create(actor: &ActorContext, pet_tutor_id: &str) -> AccessDecision {
        match actor.role {
            Some(Role::Admin) | Some(Role::Staff) | Some(Role::Veterinarian) => {
                AccessDecision::Allow
            }
            Some(Role::Client) => {
                if actor.user_id == pet_tutor_id {
                    AccessDecision::Allow
                } else {
                    AccessDecision::Deny(DenyReason::NotOwner)
                }
            }
            None => AccessDecision::Deny(DenyReason::ProfileMissing),
        }
    }

    /// Object-level decision for an existing appointment. `pet_tutor_id` is
    /// the tutor of the appointment's pet.
    pub fn check(actor: &ActorContext, pet_tutor_id: &str, op: Operation) -> AccessDecision {
        if actor.is_admin() {
            return AccessDecision::Allow;
        }

        match op {
            Operation::Create => Self::check_create(actor, pet_tutor_id),
            Operation::List | Operation::Retrieve => match actor.role {
                Some(Role::Staff) | Some(Role::Veterinarian) => AccessDecision::Allow,
                Some(Role::Client) | None => {
                    if actor.user_id == pet_tutor_id {
                        AccessDecision::Allow
                    } else {
                        AccessDecision::Deny(DenyReason::NotOwner)
                    }
                }
                Some(Role::Admin) => AccessDecision::Allow,
            },
            Operation::Update => match actor.role {
                Some(Role::Staff) | Some(Role::Veterinarian) => AccessDecision::Allow,
                Some(Role::Client) => AccessDecision::Deny(DenyReason::ClientForbidden),
                Some(Role::Admin) => AccessDecision::Allow,
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
