//! Clinic schedule configuration: operating hours and holidays.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Storage format for opening/closing times.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Opening hours for one weekday. At most one record per weekday.
///
/// Weekday numbering is 0 = Monday .. 6 = Sunday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatingHours {
    /// Weekday, 0 = Monday .. 6 = Sunday
    pub weekday: u8,
    /// Opening time, "HH:MM"
    pub open_time: String,
    /// Closing time, "HH:MM", strictly after opening
    pub close_time: String,
    /// Whether the clinic opens at all on this weekday
    pub active: bool,
    /// Last update timestamp
    pub updated_at: String,
}

impl OperatingHours {
    pub fn new(weekday: u8, open_time: String, close_time: String) -> Self {
        Self {
            weekday,
            open_time,
            close_time,
            active: true,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Parse the stored opening time.
    pub fn open(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.open_time, TIME_OF_DAY_FORMAT).ok()
    }

    /// Parse the stored closing time.
    pub fn close(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.close_time, TIME_OF_DAY_FORMAT).ok()
    }

    /// Whether `t` falls inside the opening window. The closing boundary is
    /// inclusive: a booking exactly at closing time is admitted, and the
    /// window does not account for service duration running past closing.
    pub fn spans(&self, t: NaiveTime) -> bool {
        match (self.open(), self.close()) {
            (Some(open), Some(close)) => open <= t && t <= close,
            _ => false,
        }
    }
}

/// Weekday index (0 = Monday .. 6 = Sunday) for a calendar date.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// A day the clinic is closed. Recurring holidays repeat every year on the
/// same month/day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holiday {
    /// UUID, generated locally
    pub id: String,
    /// Calendar date, "YYYY-MM-DD", unique
    pub date: String,
    /// Holiday name
    pub name: String,
    /// Repeats annually on the same month/day
    pub recurring: bool,
    /// Whether the holiday currently closes the clinic
    pub active: bool,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Holiday {
    pub fn new(date: String, name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            name,
            recurring: false,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Parse the stored date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }

    /// Whether this holiday closes the clinic on `d`: exact-date match, or
    /// month/day match against any year when recurring.
    pub fn closes(&self, d: NaiveDate) -> bool {
        if !self.active {
            return false;
        }
        match self.date() {
            Some(own) => {
                own == d || (self.recurring && own.month() == d.month() && own.day() == d.day())
            }
            None => false,
        }
    }
}
