//! User and role database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Role, User};

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const USER_COLUMNS: &str = "id, username, name, email, phone, created_at, updated_at";

impl Database {
    /// Insert a user together with its role record, atomically. This is the
    /// only construction path: a user never exists without exactly one role.
    pub fn create_user_with_role(&mut self, user: &User, role: Role) -> DbResult<()> {
        let tx = self.transaction()?;
        tx.execute(
            r#"
            INSERT INTO users (id, username, name, email, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                user.id,
                user.username,
                user.name,
                user.email,
                user.phone,
                user.created_at,
                user.updated_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)",
            params![user.id, role.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
                [id],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a user by username.
    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"),
                [username],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all users ordered by username.
    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))?;
        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count all users.
    pub fn count_users(&self) -> DbResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Look up a user's role. `None` means the role record is missing; the
    /// access layer must fail closed on that.
    pub fn get_role(&self, user_id: &str) -> DbResult<Option<Role>> {
        let token: Option<String> = self
            .conn
            .query_row(
                "SELECT role FROM user_roles WHERE user_id = ?",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token.as_deref().and_then(Role::parse))
    }

    /// Replace a user's role.
    pub fn set_role(&self, user_id: &str, role: Role) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE user_roles SET role = ?2, updated_at = datetime('now') WHERE user_id = ?1",
            params![user_id, role.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a user. Fails while pets or medical records still reference it.
    pub fn delete_user(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
