//! Appointment admission logic.
//!
//! Pipeline: Operating-hours/holiday gate → Conflict check → Accept

mod conflict;
mod hours;
mod slots;

pub use conflict::*;
pub use hours::*;
pub use slots::*;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::db::Database;
use crate::models::Service;

/// Scheduling errors. Everything here is a business-rule rejection raised at
/// the point of detection; nothing is retried locally.
#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("pet already has a conflicting appointment ({0})")]
    Conflict(String),

    #[error("clinic is closed on that day")]
    ClinicClosed,

    #[error("clinic is open {open}-{close} on that day")]
    OutsideHours { open: String, close: String },

    #[error("clinic is closed for {0}")]
    Holiday(String),

    #[error("service has no usable duration: {0}")]
    UnusableDuration(String),

    #[error("date is in the past")]
    PastDate,

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Coordinates the admission checks for one candidate booking.
pub struct Scheduler<'a> {
    db: &'a Database,
    hours: HoursGate<'a>,
    conflicts: ConflictChecker<'a>,
}

impl<'a> Scheduler<'a> {
    /// Create a new scheduler.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            hours: HoursGate::new(db),
            conflicts: ConflictChecker::new(db),
        }
    }

    /// Decide whether a candidate booking is admissible: the service must
    /// have a real duration, the clinic must be open, and the pet's schedule
    /// must be free of overlaps. Returns the resolved duration in minutes.
    ///
    /// `exclude_id` removes the appointment being rescheduled from the
    /// comparison set so it cannot conflict with itself.
    pub fn admit(
        &self,
        pet_id: &str,
        service: &Service,
        start: NaiveDateTime,
        exclude_id: Option<&str>,
    ) -> SchedulingResult<i64> {
        if !service.has_usable_duration() {
            return Err(SchedulingError::UnusableDuration(service.id.clone()));
        }
        self.hours.check(start)?;
        self.conflicts
            .check(pet_id, start, service.duration_minutes, exclude_id)?;
        Ok(service.duration_minutes)
    }

    /// Free hourly slots for a date; see [`available_slots`].
    pub fn available_slots(
        &self,
        date_str: &str,
        pet_id: Option<&str>,
    ) -> SchedulingResult<Vec<String>> {
        available_slots(self.db, &self.hours, date_str, pet_id)
    }
}
