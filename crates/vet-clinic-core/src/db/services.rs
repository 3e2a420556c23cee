//! Service catalog database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Service;

const SERVICE_COLUMNS: &str = "id, name, price, duration_minutes, active, created_at, updated_at";

fn service_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        duration_minutes: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl Database {
    /// Insert a new service.
    pub fn insert_service(&self, service: &Service) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO services (
                id, name, price, duration_minutes, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                service.id,
                service.name,
                service.price,
                service.duration_minutes,
                service.active,
                service.created_at,
                service.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing service.
    pub fn update_service(&self, service: &Service) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE services SET
                name = ?2,
                price = ?3,
                duration_minutes = ?4,
                active = ?5,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                service.id,
                service.name,
                service.price,
                service.duration_minutes,
                service.active,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a service by ID.
    pub fn get_service(&self, id: &str) -> DbResult<Option<Service>> {
        self.conn
            .query_row(
                &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?"),
                [id],
                service_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all services.
    pub fn list_services(&self) -> DbResult<Vec<Service>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY name"))?;
        let rows = stmt.query_map([], service_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a service. Fails while appointments reference it.
    pub fn delete_service(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM services WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
