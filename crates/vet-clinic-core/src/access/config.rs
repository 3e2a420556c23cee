//! Access policy for clinic configuration (services, hours, holidays).

use super::{AccessDecision, ActorContext, DenyReason, Operation};

/// The configuration resource families this policy covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigResource {
    /// Bookable service catalog. Clients may browse it.
    Service,
    /// Weekly opening hours.
    OperatingHours,
    /// Holiday calendar.
    Holiday,
}

/// Decides what an actor may do with clinic configuration.
///
/// All writes are admin-only. Personnel read everything; clients read only
/// the service catalog.
pub struct ConfigAccess;

impl ConfigAccess {
    pub fn check(actor: &ActorContext, resource: ConfigResource, op: Operation) -> AccessDecision {
        if actor.is_admin() {
            return AccessDecision::Allow;
        }

        match op {
            Operation::List | Operation::Retrieve => match resource {
                ConfigResource::Service => AccessDecision::Allow,
                ConfigResource::OperatingHours | ConfigResource::Holiday => {
                    if actor.is_personnel() {
                        AccessDecision::Allow
                    } else {
                        AccessDecision::Deny(DenyReason::StaffOnly)
                    }
                }
            },
            Operation::Create | Operation::Update | Operation::Delete => {
                AccessDecision::Deny(DenyReason::AdminOnly)
            }
        }
    }
}
