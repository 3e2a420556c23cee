//! Pet database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Pet, Sex};

const PET_COLUMNS: &str =
    "id, tutor_id, name, species, breed, birth_date, sex, notes, created_at, updated_at";

fn pet_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pet> {
    let sex_token: String = row.get(6)?;
    Ok(Pet {
        id: row.get(0)?,
        tutor_id: row.get(1)?,
        name: row.get(2)?,
        species: row.get(3)?,
        breed: row.get(4)?,
        birth_date: row.get(5)?,
        sex: Sex::parse(&sex_token).unwrap_or(Sex::M),
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl Database {
    /// Insert a new pet.
    pub fn insert_pet(&self, pet: &Pet) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO pets (
                id, tutor_id, name, species, breed, birth_date,
                sex, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                pet.id,
                pet.tutor_id,
                pet.name,
                pet.species,
                pet.breed,
                pet.birth_date,
                pet.sex.as_str(),
                pet.notes,
                pet.created_at,
                pet.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing pet (tutor reassignment included).
    pub fn update_pet(&self, pet: &Pet) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE pets SET
                tutor_id = ?2,
                name = ?3,
                species = ?4,
                breed = ?5,
                birth_date = ?6,
                sex = ?7,
                notes = ?8,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                pet.id,
                pet.tutor_id,
                pet.name,
                pet.species,
                pet.breed,
                pet.birth_date,
                pet.sex.as_str(),
                pet.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a pet by ID.
    pub fn get_pet(&self, id: &str) -> DbResult<Option<Pet>> {
        self.conn
            .query_row(
                &format!("SELECT {PET_COLUMNS} FROM pets WHERE id = ?"),
                [id],
                pet_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all pets.
    pub fn list_pets(&self) -> DbResult<Vec<Pet>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PET_COLUMNS} FROM pets ORDER BY name"))?;
        let rows = stmt.query_map([], pet_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List the pets owned by one tutor.
    pub fn list_pets_by_tutor(&self, tutor_id: &str) -> DbResult<Vec<Pet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PET_COLUMNS} FROM pets WHERE tutor_id = ? ORDER BY name"
        ))?;
        let rows = stmt.query_map([tutor_id], pet_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a pet. Its appointments cascade; medical records block the
    /// delete.
    pub fn delete_pet(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM pets WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
