//! End-to-end booking scenarios through the clinic core.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use vet_clinic_core::{
    open_clinic_in_memory, AppointmentStatus, AppointmentUpdate, BookingRequest, ClinicCore,
    ClinicError, ConsultationType, HoursSpec, NewHoliday, NewMedicalRecord, NewPet, NewService,
    NewUser, Pet, Role, Service, Sex, User,
};

use std::sync::Arc;

struct Fixture {
    clinic: Arc<ClinicCore>,
    admin: User,
    staff: User,
    vet: User,
    client: User,
    client2: User,
    pet: Pet,
    service: Service,
}

fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.into(),
        name: username.into(),
        email: format!("{username}@example.com"),
        phone: None,
        role,
    }
}

fn setup() -> Fixture {
    let clinic = open_clinic_in_memory().unwrap();

    // first account bootstraps the admin
    let admin = clinic.create_user(None, new_user("admin", Role::Admin)).unwrap();
    let admin_id = admin.id.clone();
    let staff = clinic
        .create_user(Some(&admin_id), new_user("staff", Role::Staff))
        .unwrap();
    let vet = clinic
        .create_user(Some(&admin_id), new_user("vet", Role::Veterinarian))
        .unwrap();
    let client = clinic.create_user(None, new_user("client", Role::Client)).unwrap();
    let client2 = clinic.create_user(None, new_user("client2", Role::Client)).unwrap();

    for weekday in 0..7 {
        clinic
            .set_operating_hours(
                Some(&admin_id),
                HoursSpec {
                    weekday,
                    open_time: "08:00".into(),
                    close_time: "18:00".into(),
                    active: true,
                },
            )
            .unwrap();
    }

    let service = clinic
        .create_service(
            Some(&admin_id),
            NewService {
                name: "Consulta".into(),
                price: 120.0,
                duration_minutes: 60,
            },
        )
        .unwrap();

    let pet = clinic
        .create_pet(
            Some(&client.id),
            NewPet {
                tutor_id: client.id.clone(),
                name: "Max".into(),
                species: "canine".into(),
                breed: Some("Golden Retriever".into()),
                birth_date: None,
                sex: Sex::M,
                notes: None,
            },
        )
        .unwrap();

    Fixture {
        clinic,
        admin,
        staff,
        vet,
        client,
        client2,
        pet,
        service,
    }
}

fn tomorrow() -> NaiveDate {
    chrono::Local::now().date_naive() + Duration::days(1)
}

fn tomorrow_at(h: u32, m: u32) -> String {
    format!("{} {:02}:{:02}:00", tomorrow().format("%Y-%m-%d"), h, m)
}

fn booking(pet_id: &str, service_id: &str, start_time: String) -> BookingRequest {
    BookingRequest {
        pet_id: pet_id.into(),
        service_id: service_id.into(),
        start_time,
        notes: None,
    }
}

// =========================================================================
// Booking scenarios
// =========================================================================

#[test]
fn test_client_books_own_pet() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(appointment.pet_id, f.pet.id);
}

#[test]
fn test_other_client_cannot_book_for_foreign_pet() {
    let f = setup();

    let result = f.clinic.book_appointment(
        Some(&f.client2.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
    );

    match result {
        Err(ClinicError::PermissionDenied { reason }) => {
            assert_eq!(reason, "not_owner");
        }
        other => panic!("expected permission denial, got {:?}", other.map(|a| a.id)),
    }
}

#[test]
fn test_overlapping_booking_rejected() {
    let f = setup();

    f.clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    // 10:00-11:00 and 10:30-11:30 overlap
    let result = f.clinic.book_appointment(
        Some(&f.client.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(10, 30)),
    );

    match result {
        Err(err @ ClinicError::Validation { .. }) => {
            assert_eq!(err.http_status(), 400);
            match &err {
                ClinicError::Validation { field, message } => {
                    assert_eq!(field, "start_time");
                    assert!(message.contains("conflicting appointment"), "{message}");
                }
                _ => unreachable!(),
            }
        }
        other => panic!("expected validation error, got {:?}", other.map(|a| a.id)),
    }
}

#[test]
fn test_identical_start_rejected() {
    let f = setup();

    f.clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    let result = f.clinic.book_appointment(
        Some(&f.staff.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
    );
    assert!(matches!(result, Err(ClinicError::Validation { .. })));
}

#[test]
fn test_touching_intervals_accepted() {
    let f = setup();

    f.clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    // starts exactly when the first one ends
    let result = f.clinic.book_appointment(
        Some(&f.client.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(11, 0)),
    );
    assert!(result.is_ok());
}

#[test]
fn test_different_pets_share_the_hour() {
    let f = setup();

    let other_pet = f
        .clinic
        .create_pet(
            Some(&f.client2.id),
            NewPet {
                tutor_id: f.client2.id.clone(),
                name: "Luna".into(),
                species: "feline".into(),
                breed: None,
                birth_date: None,
                sex: Sex::F,
                notes: None,
            },
        )
        .unwrap();

    f.clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    let result = f.clinic.book_appointment(
        Some(&f.client2.id),
        booking(&other_pet.id, &f.service.id, tomorrow_at(10, 0)),
    );
    assert!(result.is_ok());
}

#[test]
fn test_cancel_frees_the_interval() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    f.clinic
        .cancel_appointment(Some(&f.staff.id), &appointment.id)
        .unwrap();

    let result = f.clinic.book_appointment(
        Some(&f.client.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
    );
    assert!(result.is_ok());
}

#[test]
fn test_cancel_twice_is_rejected() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    f.clinic
        .cancel_appointment(Some(&f.staff.id), &appointment.id)
        .unwrap();

    let result = f.clinic.cancel_appointment(Some(&f.staff.id), &appointment.id);
    assert!(matches!(result, Err(ClinicError::Validation { .. })));

    // and there is no way back out of COMPLETED either
    let other = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(14, 0)),
        )
        .unwrap();
    f.clinic
        .complete_appointment(Some(&f.vet.id), &other.id)
        .unwrap();
    let result = f.clinic.cancel_appointment(Some(&f.vet.id), &other.id);
    assert!(matches!(result, Err(ClinicError::Validation { .. })));
}

#[test]
fn test_reschedule_excludes_itself_and_reruns_checks() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    // shifting into its own old interval is fine
    let updated = f
        .clinic
        .update_appointment(
            Some(&f.staff.id),
            &appointment.id,
            AppointmentUpdate {
                start_time: Some(tomorrow_at(10, 30)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.start_time, tomorrow_at(10, 30));

    // but colliding with another appointment is not
    let other = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(14, 0)),
        )
        .unwrap();
    let result = f.clinic.update_appointment(
        Some(&f.staff.id),
        &other.id,
        AppointmentUpdate {
            start_time: Some(tomorrow_at(10, 45)),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(ClinicError::Validation { .. })));

    // and neither is rescheduling outside opening hours
    let result = f.clinic.update_appointment(
        Some(&f.staff.id),
        &other.id,
        AppointmentUpdate {
            start_time: Some(tomorrow_at(22, 0)),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(ClinicError::Validation { .. })));
}

#[test]
fn test_client_cannot_reschedule() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    let result = f.clinic.update_appointment(
        Some(&f.client.id),
        &appointment.id,
        AppointmentUpdate {
            start_time: Some(tomorrow_at(11, 0)),
            ..Default::default()
        },
    );
    match result {
        Err(ClinicError::PermissionDenied { reason }) => assert_eq!(reason, "client_forbidden"),
        other => panic!("expected permission denial, got {:?}", other.map(|a| a.id)),
    }
}

#[test]
fn test_foreign_appointment_is_invisible_to_client() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    let result = f.clinic.get_appointment(Some(&f.client2.id), &appointment.id);
    match result {
        Err(err @ ClinicError::NotFound(_)) => assert_eq!(err.http_status(), 404),
        other => panic!("expected not found, got {:?}", other.map(|a| a.id)),
    }

    // scope narrowing on list
    let visible = f.clinic.list_appointments(Some(&f.client2.id)).unwrap();
    assert!(visible.is_empty());
    let visible = f.clinic.list_appointments(Some(&f.client.id)).unwrap();
    assert_eq!(visible.len(), 1);
}

#[test]
fn test_anonymous_caller_is_rejected() {
    let f = setup();

    let result = f
        .clinic
        .book_appointment(None, booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)));
    match result {
        Err(err @ ClinicError::AuthenticationRequired) => assert_eq!(err.http_status(), 401),
        other => panic!("expected authentication error, got {:?}", other.map(|a| a.id)),
    }
}

#[test]
fn test_zero_duration_service_rejected_at_creation() {
    let f = setup();

    let result = f.clinic.create_service(
        Some(&f.admin.id),
        NewService {
            name: "Quebrado".into(),
            price: 10.0,
            duration_minutes: 0,
        },
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "duration_minutes"
    ));

    let result = f.clinic.book_appointment(
        Some(&f.client.id),
        booking(&f.pet.id, "no-such-service", tomorrow_at(10, 0)),
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "service_id"
    ));
}

#[test]
fn test_delete_appointment_is_admin_only() {
    let f = setup();

    let appointment = f
        .clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    let result = f.clinic.delete_appointment(Some(&f.staff.id), &appointment.id);
    match result {
        Err(ClinicError::PermissionDenied { reason }) => assert_eq!(reason, "admin_only"),
        other => panic!("expected permission denial, got {:?}", other),
    }

    f.clinic
        .delete_appointment(Some(&f.admin.id), &appointment.id)
        .unwrap();
}

// =========================================================================
// Operating hours and holidays
// =========================================================================

#[test]
fn test_booking_outside_hours_rejected() {
    let f = setup();

    let result = f.clinic.book_appointment(
        Some(&f.client.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(19, 0)),
    );
    assert!(matches!(result, Err(ClinicError::Validation { .. })));
}

#[test]
fn test_holiday_blocks_booking() {
    let f = setup();

    f.clinic
        .add_holiday(
            Some(&f.admin.id),
            NewHoliday {
                date: tomorrow().format("%Y-%m-%d").to_string(),
                name: "Feriado municipal".into(),
                recurring: false,
            },
        )
        .unwrap();

    let result = f.clinic.book_appointment(
        Some(&f.client.id),
        booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
    );
    match result {
        Err(ClinicError::Validation { field, message }) => {
            assert_eq!(field, "start_time");
            assert!(message.contains("Feriado municipal"), "{message}");
        }
        other => panic!("expected validation error, got {:?}", other.map(|a| a.id)),
    }
}

#[test]
fn test_holiday_validation() {
    let f = setup();

    let result = f.clinic.add_holiday(
        Some(&f.admin.id),
        NewHoliday {
            date: "2020-01-01".into(),
            name: "Ano novo".into(),
            recurring: false,
        },
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "date"
    ));

    let result = f.clinic.add_holiday(
        Some(&f.admin.id),
        NewHoliday {
            date: tomorrow().format("%Y-%m-%d").to_string(),
            name: "Ab".into(),
            recurring: false,
        },
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "name"
    ));

    // staff cannot write configuration at all
    let result = f.clinic.add_holiday(
        Some(&f.staff.id),
        NewHoliday {
            date: tomorrow().format("%Y-%m-%d").to_string(),
            name: "Feriado".into(),
            recurring: false,
        },
    );
    assert!(matches!(result, Err(ClinicError::PermissionDenied { .. })));
}

#[test]
fn test_closing_before_opening_rejected() {
    let f = setup();

    let result = f.clinic.set_operating_hours(
        Some(&f.admin.id),
        HoursSpec {
            weekday: 0,
            open_time: "18:00".into(),
            close_time: "08:00".into(),
            active: true,
        },
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "close_time"
    ));
}

// =========================================================================
// Available slots
// =========================================================================

#[test]
fn test_available_slots_excludes_booked_hour() {
    let f = setup();

    f.clinic
        .book_appointment(
            Some(&f.client.id),
            booking(&f.pet.id, &f.service.id, tomorrow_at(10, 0)),
        )
        .unwrap();

    let date = tomorrow().format("%Y-%m-%d").to_string();
    let slots = f
        .clinic
        .available_slots(Some(&f.client.id), &date, Some(&f.pet.id))
        .unwrap();

    assert!(!slots.contains(&"10:00".to_string()));
    assert!(slots.contains(&"09:00".to_string()));
    assert!(slots.contains(&"11:00".to_string()));

    // ordering is ascending
    let mut sorted = slots.clone();
    sorted.sort();
    assert_eq!(slots, sorted);
}

#[test]
fn test_available_slots_date_errors_are_distinct() {
    let f = setup();

    let past = f
        .clinic
        .available_slots(Some(&f.client.id), "2020-01-01", None)
        .unwrap_err();
    let invalid = f
        .clinic
        .available_slots(Some(&f.client.id), "01/01/2030", None)
        .unwrap_err();

    match (&past, &invalid) {
        (
            ClinicError::Validation { message: past_msg, .. },
            ClinicError::Validation { message: invalid_msg, .. },
        ) => {
            assert_ne!(past_msg, invalid_msg);
            assert!(past_msg.contains("past"), "{past_msg}");
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
}

// =========================================================================
// Pet deletion rules
// =========================================================================

#[test]
fn test_staff_deletes_client_pet_but_not_staff_pet() {
    let f = setup();

    // pet owned by a client: staff may delete
    f.clinic.delete_pet(Some(&f.staff.id), &f.pet.id).unwrap();

    // pet owned by another staff account: denied with reason code
    let staff2 = f
        .clinic
        .create_user(Some(&f.admin.id), new_user("staff2", Role::Staff))
        .unwrap();
    let staff_pet = f
        .clinic
        .create_pet(
            Some(&staff2.id),
            NewPet {
                tutor_id: staff2.id.clone(),
                name: "Thor".into(),
                species: "canine".into(),
                breed: None,
                birth_date: None,
                sex: Sex::M,
                notes: None,
            },
        )
        .unwrap();

    let result = f.clinic.delete_pet(Some(&f.staff.id), &staff_pet.id);
    match result {
        Err(err @ ClinicError::PermissionDenied { .. }) => {
            assert_eq!(err.http_status(), 403);
            match &err {
                ClinicError::PermissionDenied { reason } => {
                    assert_eq!(reason, "funcionario_delete_cliente_only");
                }
                _ => unreachable!(),
            }
        }
        other => panic!("expected permission denial, got {:?}", other),
    }
}

#[test]
fn test_veterinarian_cannot_delete_pets() {
    let f = setup();

    let result = f.clinic.delete_pet(Some(&f.vet.id), &f.pet.id);
    match result {
        Err(ClinicError::PermissionDenied { reason }) => {
            assert_eq!(reason, "veterinario_no_delete");
        }
        other => panic!("expected permission denial, got {:?}", other),
    }
}

// =========================================================================
// Medical records
// =========================================================================

#[test]
fn test_medical_record_flow() {
    let f = setup();

    // vet authors a record for the client's pet
    let record = f
        .clinic
        .add_medical_record(
            Some(&f.vet.id),
            NewMedicalRecord {
                pet_id: f.pet.id.clone(),
                consulted_at: tomorrow_at(10, 0),
                consultation_type: ConsultationType::Routine,
                weight_kg: Some(30.0),
                temperature_c: Some(38.5),
                symptoms: Some("letargia".into()),
                diagnosis: None,
                treatment: None,
                prescription: None,
            },
        )
        .unwrap();
    assert_eq!(record.veterinarian_id, f.vet.id);

    // the tutor can read it, another client cannot even see it
    f.clinic
        .get_medical_record(Some(&f.client.id), &record.id)
        .unwrap();
    assert!(matches!(
        f.clinic.get_medical_record(Some(&f.client2.id), &record.id),
        Err(ClinicError::NotFound(_))
    ));

    let history = f
        .clinic
        .list_pet_medical_records(Some(&f.client.id), &f.pet.id)
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(matches!(
        f.clinic.list_pet_medical_records(Some(&f.client2.id), &f.pet.id),
        Err(ClinicError::NotFound(_))
    ));

    // clients never author records, not even for their own pets
    let result = f.clinic.add_medical_record(
        Some(&f.client.id),
        NewMedicalRecord {
            pet_id: f.pet.id.clone(),
            consulted_at: tomorrow_at(11, 0),
            consultation_type: ConsultationType::Routine,
            weight_kg: None,
            temperature_c: None,
            symptoms: None,
            diagnosis: None,
            treatment: None,
            prescription: None,
        },
    );
    match result {
        Err(ClinicError::PermissionDenied { reason }) => assert_eq!(reason, "client_forbidden"),
        other => panic!("expected permission denial, got {:?}", other.map(|r| r.id)),
    }

    // deletion is admin-only
    assert!(matches!(
        f.clinic.delete_medical_record(Some(&f.vet.id), &record.id),
        Err(ClinicError::PermissionDenied { .. })
    ));
    f.clinic
        .delete_medical_record(Some(&f.admin.id), &record.id)
        .unwrap();
}

#[test]
fn test_medical_record_vitals_validated() {
    let f = setup();

    let result = f.clinic.add_medical_record(
        Some(&f.vet.id),
        NewMedicalRecord {
            pet_id: f.pet.id.clone(),
            consulted_at: tomorrow_at(10, 0),
            consultation_type: ConsultationType::Emergency,
            weight_kg: Some(-2.0),
            temperature_c: None,
            symptoms: None,
            diagnosis: None,
            treatment: None,
            prescription: None,
        },
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "weight_kg"
    ));

    let result = f.clinic.add_medical_record(
        Some(&f.vet.id),
        NewMedicalRecord {
            pet_id: f.pet.id.clone(),
            consulted_at: tomorrow_at(10, 0),
            consultation_type: ConsultationType::Emergency,
            weight_kg: Some(30.0),
            temperature_c: Some(50.0),
            symptoms: None,
            diagnosis: None,
            treatment: None,
            prescription: None,
        },
    );
    assert!(matches!(
        result,
        Err(ClinicError::Validation { ref field, .. }) if field == "temperature_c"
    ));
}

// =========================================================================
// Interval overlap property
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A second booking for the same pet is accepted iff the two half-open
    /// intervals do not overlap.
    #[test]
    fn prop_booking_accepted_iff_non_overlapping(
        a_offset in 0i64..480,
        a_duration in 1i64..120,
        b_offset in 0i64..480,
        b_duration in 1i64..120,
    ) {
        let f = setup();

        let first = f.clinic.create_service(
            Some(&f.admin.id),
            NewService { name: "A".into(), price: 10.0, duration_minutes: a_duration },
        ).unwrap();
        let second = f.clinic.create_service(
            Some(&f.admin.id),
            NewService { name: "B".into(), price: 10.0, duration_minutes: b_duration },
        ).unwrap();

        let day = NaiveDate::from_ymd_opt(2030, 6, 15).unwrap();
        let base = day.and_hms_opt(8, 0, 0).unwrap();
        let a_start = base + Duration::minutes(a_offset);
        let b_start = base + Duration::minutes(b_offset);

        f.clinic.book_appointment(
            Some(&f.staff.id),
            booking(&f.pet.id, &first.id, a_start.format("%Y-%m-%d %H:%M:%S").to_string()),
        ).unwrap();

        let result = f.clinic.book_appointment(
            Some(&f.staff.id),
            booking(&f.pet.id, &second.id, b_start.format("%Y-%m-%d %H:%M:%S").to_string()),
        );

        let a_end = a_start + Duration::minutes(a_duration);
        let b_end = b_start + Duration::minutes(b_duration);
        let overlaps = a_start < b_end && b_start < a_end;

        prop_assert_eq!(result.is_ok(), !overlaps);
    }
}
