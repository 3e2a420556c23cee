//! Appointment database operations.
//!
//! The overlap scan and the insert/reschedule that depends on it run inside
//! a single transaction, so two concurrent writers can never both pass the
//! check and both commit an overlapping pair.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{Database, DbError, DbResult};
use crate::models::{
    intervals_overlap, interval_end, Appointment, AppointmentStatus, START_TIME_FORMAT,
};

const APPOINTMENT_COLUMNS: &str =
    "id, pet_id, service_id, start_time, status, notes, created_at, updated_at";

fn appointment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    let status_token: String = row.get(4)?;
    Ok(Appointment {
        id: row.get(0)?,
        pet_id: row.get(1)?,
        service_id: row.get(2)?,
        start_time: row.get(3)?,
        status: AppointmentStatus::parse(&status_token).unwrap_or(AppointmentStatus::Scheduled),
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Find a non-cancelled appointment for `pet_id` whose derived interval
/// overlaps `[start, end)`. Runs against whatever connection (or open
/// transaction) it is handed, so the atomic write paths reuse it.
fn scan_overlap(
    conn: &Connection,
    pet_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    exclude_id: Option<&str>,
) -> DbResult<Option<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT a.id, a.start_time, s.duration_minutes
        FROM appointments a
        JOIN services s ON s.id = a.service_id
        WHERE a.pet_id = ?1 AND a.status != 'CANCELLED'
        "#,
    )?;

    let rows = stmt.query_map([pet_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    for row in rows {
        let (id, start_text, duration_minutes) = row?;
        if exclude_id == Some(id.as_str()) {
            continue;
        }
        let other_start = NaiveDateTime::parse_from_str(&start_text, START_TIME_FORMAT)
            .map_err(|_| DbError::Constraint(format!("unparsable start_time on appointment {id}")))?;
        let other_end = interval_end(other_start, duration_minutes);
        if intervals_overlap(start, end, other_start, other_end) {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

impl Database {
    /// Read-only overlap probe for the conflict checker.
    pub fn find_conflicting_appointment(
        &self,
        pet_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        exclude_id: Option<&str>,
    ) -> DbResult<Option<String>> {
        scan_overlap(&self.conn, pet_id, start, end, exclude_id)
    }

    /// Atomically re-check the pet's schedule and insert the appointment.
    /// Returns the conflicting appointment id instead of inserting when the
    /// interval is taken.
    pub fn insert_scheduled_if_free(
        &mut self,
        appointment: &Appointment,
        duration_minutes: i64,
    ) -> DbResult<Option<String>> {
        let start = appointment
            .start()
            .ok_or_else(|| DbError::Constraint("unparsable start_time".into()))?;
        let end = interval_end(start, duration_minutes);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(conflict) = scan_overlap(&tx, &appointment.pet_id, start, end, None)? {
            return Ok(Some(conflict));
        }
        tx.execute(
            r#"
            INSERT INTO appointments (
                id, pet_id, service_id, start_time, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                appointment.id,
                appointment.pet_id,
                appointment.service_id,
                appointment.start_time,
                appointment.status.as_str(),
                appointment.notes,
                appointment.created_at,
                appointment.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(None)
    }

    /// Atomically re-check the pet's schedule (excluding the appointment
    /// itself) and write its new start/service/notes. Returns the
    /// conflicting appointment id instead of updating when the new interval
    /// is taken.
    pub fn reschedule_if_free(
        &mut self,
        appointment: &Appointment,
        duration_minutes: i64,
    ) -> DbResult<Option<String>> {
        let start = appointment
            .start()
            .ok_or_else(|| DbError::Constraint("unparsable start_time".into()))?;
        let end = interval_end(start, duration_minutes);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(conflict) =
            scan_overlap(&tx, &appointment.pet_id, start, end, Some(&appointment.id))?
        {
            return Ok(Some(conflict));
        }
        tx.execute(
            r#"
            UPDATE appointments SET
                service_id = ?2,
                start_time = ?3,
                notes = ?4,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                appointment.id,
                appointment.service_id,
                appointment.start_time,
                appointment.notes,
            ],
        )?;
        tx.commit()?;
        Ok(None)
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"),
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all appointments ordered by start time.
    pub fn list_appointments(&self) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY start_time"
        ))?;
        let rows = stmt.query_map([], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List appointments for pets owned by one tutor.
    pub fn list_appointments_by_tutor(&self, tutor_id: &str) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS} FROM appointments
            WHERE pet_id IN (SELECT id FROM pets WHERE tutor_id = ?)
            ORDER BY start_time
            "#
        ))?;
        let rows = stmt.query_map([tutor_id], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List a pet's non-cancelled appointments with their derived durations.
    pub fn list_holding_appointments_for_pet(
        &self,
        pet_id: &str,
    ) -> DbResult<Vec<(Appointment, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.pet_id, a.service_id, a.start_time, a.status,
                   a.notes, a.created_at, a.updated_at, s.duration_minutes
            FROM appointments a
            JOIN services s ON s.id = a.service_id
            WHERE a.pet_id = ?1 AND a.status != 'CANCELLED'
            ORDER BY a.start_time
            "#,
        )?;
        let rows = stmt.query_map([pet_id], |row| {
            Ok((appointment_from_row(row)?, row.get::<_, i64>(8)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Write a status transition.
    pub fn update_appointment_status(&self, id: &str, status: AppointmentStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Update only the notes field.
    pub fn update_appointment_notes(&self, id: &str, notes: Option<&str>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET notes = ?2, updated_at = datetime('now') WHERE id = ?1",
            params![id, notes],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete an appointment.
    pub fn delete_appointment(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM appointments WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
