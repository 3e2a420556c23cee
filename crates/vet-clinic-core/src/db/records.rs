//! Medical record database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{ConsultationType, MedicalRecord};

const RECORD_COLUMNS: &str = "id, pet_id, veterinarian_id, consulted_at, consultation_type, \
     weight_kg, temperature_c, symptoms, diagnosis, treatment, prescription, \
     created_at, updated_at";

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MedicalRecord> {
    let type_token: String = row.get(4)?;
    Ok(MedicalRecord {
        id: row.get(0)?,
        pet_id: row.get(1)?,
        veterinarian_id: row.get(2)?,
        consulted_at: row.get(3)?,
        consultation_type: ConsultationType::parse(&type_token)
            .unwrap_or(ConsultationType::Routine),
        weight_kg: row.get(5)?,
        temperature_c: row.get(6)?,
        symptoms: row.get(7)?,
        diagnosis: row.get(8)?,
        treatment: row.get(9)?,
        prescription: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl Database {
    /// Insert a new medical record.
    pub fn insert_record(&self, record: &MedicalRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medical_records (
                id, pet_id, veterinarian_id, consulted_at, consultation_type,
                weight_kg, temperature_c, symptoms, diagnosis, treatment,
                prescription, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.id,
                record.pet_id,
                record.veterinarian_id,
                record.consulted_at,
                record.consultation_type.as_str(),
                record.weight_kg,
                record.temperature_c,
                record.symptoms,
                record.diagnosis,
                record.treatment,
                record.prescription,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing record's clinical fields.
    pub fn update_record(&self, record: &MedicalRecord) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medical_records SET
                consulted_at = ?2,
                consultation_type = ?3,
                weight_kg = ?4,
                temperature_c = ?5,
                symptoms = ?6,
                diagnosis = ?7,
                treatment = ?8,
                prescription = ?9,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.consulted_at,
                record.consultation_type.as_str(),
                record.weight_kg,
                record.temperature_c,
                record.symptoms,
                record.diagnosis,
                record.treatment,
                record.prescription,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a record by ID.
    pub fn get_record(&self, id: &str) -> DbResult<Option<MedicalRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?"),
                [id],
                record_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all records ordered by consultation time, newest first.
    pub fn list_records(&self) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records ORDER BY consulted_at DESC"
        ))?;
        let rows = stmt.query_map([], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List records for one pet.
    pub fn list_records_for_pet(&self, pet_id: &str) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records WHERE pet_id = ? ORDER BY consulted_at DESC"
        ))?;
        let rows = stmt.query_map([pet_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List records for every pet owned by one tutor.
    pub fn list_records_by_tutor(&self, tutor_id: &str) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM medical_records
            WHERE pet_id IN (SELECT id FROM pets WHERE tutor_id = ?)
            ORDER BY consulted_at DESC
            "#
        ))?;
        let rows = stmt.query_map([tutor_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a record.
    pub fn delete_record(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM medical_records WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
