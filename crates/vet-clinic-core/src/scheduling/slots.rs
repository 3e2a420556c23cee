//! Available time-slot computation.
//!
//! Produces the ordered list of free hourly slots for one date: the fixed
//! 08:00-18:00 grid, narrowed to the day's opening window, minus the slots
//! already taken by the pet's non-cancelled appointments. Availability is
//! per pet: the conflict model lets different pets be seen simultaneously,
//! so one pet's booking never blocks another's slot.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::db::Database;
use crate::models::{interval_end, intervals_overlap};

use super::{HoursGate, SchedulingError, SchedulingResult};

/// First hour of the slot grid.
pub const SLOT_GRID_START_HOUR: u32 = 8;

/// End of the slot grid (exclusive).
pub const SLOT_GRID_END_HOUR: u32 = 18;

/// Width of one slot in minutes.
pub const SLOT_MINUTES: i64 = 60;

/// Compute the free slots for `date_str` ("YYYY-MM-DD"), ascending "HH:MM".
///
/// Unparsable dates and past dates are rejected with distinct errors. A day
/// the clinic does not open yields an empty list, not an error.
pub fn available_slots(
    db: &Database,
    hours: &HoursGate<'_>,
    date_str: &str,
    pet_id: Option<&str>,
) -> SchedulingResult<Vec<String>> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| SchedulingError::InvalidDate(date_str.to_string()))?;
    if date < chrono::Local::now().date_naive() {
        return Err(SchedulingError::PastDate);
    }

    let Some((open, close)) = hours.day_window(date)? else {
        return Ok(Vec::new());
    };

    let booked: Vec<(NaiveDateTime, NaiveDateTime)> = match pet_id {
        Some(pet_id) => db
            .list_holding_appointments_for_pet(pet_id)?
            .into_iter()
            .filter_map(|(appointment, duration_minutes)| {
                let start = appointment.start()?;
                Some((start, interval_end(start, duration_minutes)))
            })
            .collect(),
        None => Vec::new(),
    };

    let slots = (SLOT_GRID_START_HOUR..SLOT_GRID_END_HOUR)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .filter(|slot| {
            let t = slot.time();
            open <= t && t <= close
        })
        .filter(|slot| {
            let slot_end = *slot + Duration::minutes(SLOT_MINUTES);
            !booked
                .iter()
                .any(|(start, end)| intervals_overlap(*slot, slot_end, *start, *end))
        })
        .map(|slot| slot.format("%H:%M").to_string())
        .collect();

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, OperatingHours, Pet, Role, Service, Sex, User};

    fn setup() -> (Database, Pet, Service) {
        let mut db = Database::open_in_memory().unwrap();
        for weekday in 0..7 {
            db.upsert_operating_hours(&OperatingHours::new(
                weekday,
                "08:00".into(),
                "18:00".into(),
            ))
            .unwrap();
        }
        let tutor = User::new("tutor".into(), "Tutor".into(), "t@example.com".into());
        db.create_user_with_role(&tutor, Role::Client).unwrap();
        let pet = Pet::new(tutor.id.clone(), "Max".into(), "canine".into(), Sex::M);
        db.insert_pet(&pet).unwrap();
        let service = Service::new("Consulta".into(), 120.0, 60);
        db.insert_service(&service).unwrap();
        (db, pet, service)
    }

    fn tomorrow() -> NaiveDate {
        chrono::Local::now().date_naive() + Duration::days(1)
    }

    #[test]
    fn test_full_grid_when_unbooked() {
        let (db, _, _) = setup();
        let gate = HoursGate::new(&db);

        let slots =
            available_slots(&db, &gate, &tomorrow().format("%Y-%m-%d").to_string(), None).unwrap();
        assert_eq!(slots.len(), 10);
        assert_eq!(slots.first().map(String::as_str), Some("08:00"));
        assert_eq!(slots.last().map(String::as_str), Some("17:00"));
        // ascending order
        let mut sorted = slots.clone();
        sorted.sort();
        assert_eq!(slots, sorted);
    }

    #[test]
    fn test_booked_slot_removed_for_pet() {
        let (mut db, pet, service) = setup();

        let start = tomorrow().and_hms_opt(10, 0, 0).unwrap();
        let appt = Appointment::new(pet.id.clone(), service.id.clone(), start);
        db.insert_scheduled_if_free(&appt, 60).unwrap();

        let gate = HoursGate::new(&db);
        let date = tomorrow().format("%Y-%m-%d").to_string();

        let slots = available_slots(&db, &gate, &date, Some(&pet.id)).unwrap();
        assert!(!slots.contains(&"10:00".to_string()));
        assert_eq!(slots.len(), 9);

        // other pets keep the slot
        let other = Pet::new(pet.tutor_id.clone(), "Luna".into(), "feline".into(), Sex::F);
        db.insert_pet(&other).unwrap();
        let slots = available_slots(&db, &gate, &date, Some(&other.id)).unwrap();
        assert!(slots.contains(&"10:00".to_string()));
    }

    #[test]
    fn test_long_service_blocks_following_slot() {
        let (mut db, pet, _) = setup();
        let long = Service::new("Cirurgia".into(), 800.0, 120);
        db.insert_service(&long).unwrap();

        let start = tomorrow().and_hms_opt(10, 0, 0).unwrap();
        let appt = Appointment::new(pet.id.clone(), long.id.clone(), start);
        db.insert_scheduled_if_free(&appt, 120).unwrap();

        let gate = HoursGate::new(&db);
        let date = tomorrow().format("%Y-%m-%d").to_string();
        let slots = available_slots(&db, &gate, &date, Some(&pet.id)).unwrap();
        assert!(!slots.contains(&"10:00".to_string()));
        assert!(!slots.contains(&"11:00".to_string()));
        assert!(slots.contains(&"12:00".to_string()));
    }

    #[test]
    fn test_window_narrows_grid() {
        let (db, _, _) = setup();
        db.upsert_operating_hours(&OperatingHours::new(
            crate::models::weekday_index(tomorrow()),
            "09:00".into(),
            "12:00".into(),
        ))
        .unwrap();

        let gate = HoursGate::new(&db);
        let slots =
            available_slots(&db, &gate, &tomorrow().format("%Y-%m-%d").to_string(), None).unwrap();
        assert_eq!(slots, vec!["09:00", "10:00", "11:00", "12:00"]);
    }

    #[test]
    fn test_invalid_date_distinct_from_past_date() {
        let (db, _, _) = setup();
        let gate = HoursGate::new(&db);

        let result = available_slots(&db, &gate, "not-a-date", None);
        assert!(matches!(result, Err(SchedulingError::InvalidDate(_))));

        let result = available_slots(&db, &gate, "2020-01-01", None);
        assert!(matches!(result, Err(SchedulingError::PastDate)));
    }

    #[test]
    fn test_closed_day_yields_empty_list() {
        let (db, _, _) = setup();
        let weekday = crate::models::weekday_index(tomorrow());
        let mut hours = db.get_operating_hours(weekday).unwrap().unwrap();
        hours.active = false;
        db.upsert_operating_hours(&hours).unwrap();

        let gate = HoursGate::new(&db);
        let slots =
            available_slots(&db, &gate, &tomorrow().format("%Y-%m-%d").to_string(), None).unwrap();
        assert!(slots.is_empty());
    }
}
