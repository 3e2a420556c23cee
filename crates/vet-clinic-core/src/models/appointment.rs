//! Appointment models and the interval overlap rule.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Storage format for schedulable times (naive clinic wall-clock).
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lifecycle status of an appointment.
///
/// Serialized as fixed uppercase tokens: `SCHEDULED`, `COMPLETED`,
/// `CANCELLED`. Transitions are one-way out of `Scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "SCHEDULED" => Some(AppointmentStatus::Scheduled),
            "COMPLETED" => Some(AppointmentStatus::Completed),
            "CANCELLED" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether moving to `next` is a legal transition. There is no way out
    /// of `Completed` or `Cancelled`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed | AppointmentStatus::Cancelled
            )
        )
    }

    /// Cancelled appointments free their interval; everything else holds it.
    pub fn holds_interval(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

/// A booked (or historical) appointment for one pet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// UUID, generated locally
    pub id: String,
    /// The pet being seen
    pub pet_id: String,
    /// The service booked; duration is derived from it
    pub service_id: String,
    /// Start of the appointment, "YYYY-MM-DD HH:MM:SS" clinic wall-clock
    pub start_time: String,
    /// Lifecycle status
    pub status: AppointmentStatus,
    /// Free-text notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Appointment {
    /// Create a new scheduled appointment.
    pub fn new(pet_id: String, service_id: String, start: NaiveDateTime) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pet_id,
            service_id,
            start_time: start.format(START_TIME_FORMAT).to_string(),
            status: AppointmentStatus::Scheduled,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Parse the stored start time.
    pub fn start(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.start_time, START_TIME_FORMAT).ok()
    }
}

/// Half-open interval overlap: `[a_start, a_end)` intersects
/// `[b_start, b_end)` iff `a_start < b_end && b_start < a_end`.
///
/// Touching endpoints (one interval starting exactly where the other ends)
/// do not overlap; identical starts do.
pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// End of an interval beginning at `start` and lasting `duration_minutes`.
pub fn interval_end(start: NaiveDateTime, duration_minutes: i64) -> NaiveDateTime {
    start + Duration::minutes(duration_minutes)
}
