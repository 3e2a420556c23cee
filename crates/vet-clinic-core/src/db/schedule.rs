//! Operating-hours and holiday database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Holiday, OperatingHours};

fn hours_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OperatingHours> {
    Ok(OperatingHours {
        weekday: row.get(0)?,
        open_time: row.get(1)?,
        close_time: row.get(2)?,
        active: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn holiday_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Holiday> {
    Ok(Holiday {
        id: row.get(0)?,
        date: row.get(1)?,
        name: row.get(2)?,
        recurring: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl Database {
    /// Insert or replace the hours for one weekday. The weekday primary key
    /// keeps this at one record per weekday.
    pub fn upsert_operating_hours(&self, hours: &OperatingHours) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO operating_hours (weekday, open_time, close_time, active, updated_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            ON CONFLICT(weekday) DO UPDATE SET
                open_time = excluded.open_time,
                close_time = excluded.close_time,
                active = excluded.active,
                updated_at = datetime('now')
            "#,
            params![hours.weekday, hours.open_time, hours.close_time, hours.active],
        )?;
        Ok(())
    }

    /// Get the hours for one weekday (0 = Monday .. 6 = Sunday).
    pub fn get_operating_hours(&self, weekday: u8) -> DbResult<Option<OperatingHours>> {
        self.conn
            .query_row(
                "SELECT weekday, open_time, close_time, active, updated_at
                 FROM operating_hours WHERE weekday = ?",
                [weekday],
                hours_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all configured weekdays.
    pub fn list_operating_hours(&self) -> DbResult<Vec<OperatingHours>> {
        let mut stmt = self.conn.prepare(
            "SELECT weekday, open_time, close_time, active, updated_at
             FROM operating_hours ORDER BY weekday",
        )?;
        let rows = stmt.query_map([], hours_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert a new holiday. The date is unique.
    pub fn insert_holiday(&self, holiday: &Holiday) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO holidays (id, date, name, recurring, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                holiday.id,
                holiday.date,
                holiday.name,
                holiday.recurring,
                holiday.active,
                holiday.created_at,
                holiday.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update a holiday's name and flags.
    pub fn update_holiday(&self, holiday: &Holiday) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE holidays SET
                name = ?2,
                recurring = ?3,
                active = ?4,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![holiday.id, holiday.name, holiday.recurring, holiday.active],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a holiday by ID.
    pub fn get_holiday(&self, id: &str) -> DbResult<Option<Holiday>> {
        self.conn
            .query_row(
                "SELECT id, date, name, recurring, active, created_at, updated_at
                 FROM holidays WHERE id = ?",
                [id],
                holiday_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all holidays ordered by date.
    pub fn list_holidays(&self) -> DbResult<Vec<Holiday>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, name, recurring, active, created_at, updated_at
             FROM holidays ORDER BY date",
        )?;
        let rows = stmt.query_map([], holiday_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List only holidays that currently close the clinic.
    pub fn list_active_holidays(&self) -> DbResult<Vec<Holiday>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, name, recurring, active, created_at, updated_at
             FROM holidays WHERE active = 1 ORDER BY date",
        )?;
        let rows = stmt.query_map([], holiday_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a holiday.
    pub fn delete_holiday(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM holidays WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
