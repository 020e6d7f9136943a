//! User accounts. Deleting a user only marks it inactive so its history
//! stays readable.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use mockview_core::model::UserId;

use super::{format_timestamp, parse_timestamp};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_active: bool,
    pub created_at: chrono::DateTime<Utc>,
}

pub fn create_user(conn: &Connection, username: &str) -> StoreResult<User> {
    let created_at = Utc::now();
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO users (username, is_active, created_at) VALUES (?1, 1, ?2)",
        params![username, format_timestamp(&created_at)],
    )?;
    if inserted == 0 {
        return Err(StoreError::UsernameTaken(username.to_string()));
    }

    Ok(User {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        is_active: true,
        created_at,
    })
}

/// Look a user up by name, active or not.
pub fn find_user(conn: &Connection, username: &str) -> StoreResult<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, is_active, created_at FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, username, is_active, created_at)| {
        Ok(User {
            id,
            username,
            is_active,
            created_at: parse_timestamp(&created_at)?,
        })
    })
    .transpose()
}

pub fn find_active_user(conn: &Connection, username: &str) -> StoreResult<Option<User>> {
    Ok(find_user(conn, username)?.filter(|u| u.is_active))
}

/// Mark a user inactive. Returns `false` if no active user had that name.
pub fn deactivate_user(conn: &Connection, username: &str) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE users SET is_active = 0 WHERE username = ?1 AND is_active = 1",
        params![username],
    )?;
    Ok(changed > 0)
}
