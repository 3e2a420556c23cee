//! Service catalog models.

use serde::{Deserialize, Serialize};

/// A bookable clinic service (consultation, vaccination, grooming, ...).
///
/// The duration is a span, not a point; appointment intervals are derived
/// from it. Services are created and mutated only by admins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    /// UUID, generated locally
    pub id: String,
    /// Service name
    pub name: String,
    /// Price charged for the service
    pub price: f64,
    /// How long one booking of this service takes
    pub duration_minutes: i64,
    /// Whether this service can currently be booked
    pub active: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Service {
    /// Create a new active service.
    pub fn new(name: String, price: f64, duration_minutes: i64) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            price,
            duration_minutes,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// A duration that cannot produce a real interval is unusable for
    /// booking and must be reported, never defaulted.
    pub fn has_usable_duration(&self) -> bool {
        self.duration_minutes > 0
    }
}
