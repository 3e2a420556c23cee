//! Operating-hours and holiday admission gate.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::Database;
use crate::models::weekday_index;

use super::{SchedulingError, SchedulingResult};

/// Decides whether the clinic is open at a candidate date/time.
pub struct HoursGate<'a> {
    db: &'a Database,
}

impl<'a> HoursGate<'a> {
    /// Create a new gate.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Reject the candidate when its weekday has no active hours, its time
    /// falls outside the opening window, or its date is a holiday.
    ///
    /// The closing boundary is inclusive and the window ignores service
    /// duration, so a booking at closing time is admitted even though it
    /// runs past closing.
    pub fn check(&self, when: NaiveDateTime) -> SchedulingResult<()> {
        let date = when.date();
        if let Some(name) = self.holiday_closing(date)? {
            return Err(SchedulingError::Holiday(name));
        }

        match self.db.get_operating_hours(weekday_index(date))? {
            Some(hours) if hours.active => {
                if hours.spans(when.time()) {
                    Ok(())
                } else {
                    Err(SchedulingError::OutsideHours {
                        open: hours.open_time,
                        close: hours.close_time,
                    })
                }
            }
            _ => Err(SchedulingError::ClinicClosed),
        }
    }

    /// The opening window for a date, or `None` when the clinic does not
    /// open at all (no hours, inactive weekday, or holiday).
    pub fn day_window(&self, date: NaiveDate) -> SchedulingResult<Option<(NaiveTime, NaiveTime)>> {
        if self.holiday_closing(date)?.is_some() {
            return Ok(None);
        }
        match self.db.get_operating_hours(weekday_index(date))? {
            Some(hours) if hours.active => Ok(hours.open().zip(hours.close())),
            _ => Ok(None),
        }
    }

    /// Name of the active holiday closing the clinic on `date`, if any.
    fn holiday_closing(&self, date: NaiveDate) -> SchedulingResult<Option<String>> {
        Ok(self
            .db
            .list_active_holidays()?
            .into_iter()
            .find(|h| h.closes(date))
            .map(|h| h.name))
    }
}
