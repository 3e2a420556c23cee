//! Per-pet appointment conflict detection.
//!
//! Two non-cancelled appointments for the same pet conflict iff their
//! half-open `[start, start+duration)` intervals intersect. Appointments on
//! different pets never conflict, whatever their times.

use chrono::NaiveDateTime;

use crate::db::Database;
use crate::models::interval_end;

use super::{SchedulingError, SchedulingResult};

/// Read-side conflict checker over a pet's schedule.
///
/// This answers the admission question; the write paths re-run the same
/// scan inside their insert/update transaction so concurrent bookings
/// cannot both slip past it.
pub struct ConflictChecker<'a> {
    db: &'a Database,
}

impl<'a> ConflictChecker<'a> {
    /// Create a new conflict checker.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Reject the candidate interval when it overlaps an existing
    /// non-cancelled appointment for the same pet. `exclude_id` keeps a
    /// rescheduled appointment from conflicting with itself.
    pub fn check(
        &self,
        pet_id: &str,
        start: NaiveDateTime,
        duration_minutes: i64,
        exclude_id: Option<&str>,
    ) -> SchedulingResult<()> {
        let end = interval_end(start, duration_minutes);
        match self
            .db
            .find_conflicting_appointment(pet_id, start, end, exclude_id)?
        {
            Some(conflict_id) => Err(SchedulingError::Conflict(conflict_id)),
            None => Ok(()),
        }
    }
}
