//! Chat sessions and their messages.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use mockview_core::model::{Role, SessionId, StoredTurn, UserId};

use super::{format_timestamp, parse_timestamp};
use crate::error::{StoreError, StoreResult};

/// A stored session as listed for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

pub fn create_session(conn: &Connection, user_id: UserId) -> StoreResult<SessionId> {
    conn.execute(
        "INSERT INTO chat_sessions (user_id, created_at) VALUES (?1, ?2)",
        params![user_id, format_timestamp(&Utc::now())],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn session_owner(conn: &Connection, session_id: SessionId) -> StoreResult<Option<UserId>> {
    Ok(conn
        .query_row(
            "SELECT user_id FROM chat_sessions WHERE id = ?1",
            params![session_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn append_message(
    conn: &Connection,
    session_id: SessionId,
    sender: Role,
    message: &str,
    timestamp: &DateTime<Utc>,
) -> StoreResult<()> {
    if session_owner(conn, session_id)?.is_none() {
        return Err(StoreError::UnknownSession(session_id));
    }
    conn.execute(
        "INSERT INTO chat_messages (session_id, sender, message, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            session_id,
            sender.to_string(),
            message,
            format_timestamp(timestamp)
        ],
    )?;
    Ok(())
}

/// Messages of a session in the order they were written.
pub fn load_history(conn: &Connection, session_id: SessionId) -> StoreResult<Vec<StoredTurn>> {
    let mut stmt = conn.prepare(
        "SELECT sender, message, timestamp FROM chat_messages
         WHERE session_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![session_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut turns = Vec::new();
    for row in rows {
        let (sender, content, timestamp) = row?;
        let role: Role = sender.parse().map_err(StoreError::InvalidRow)?;
        turns.push(StoredTurn {
            session_id,
            role,
            content,
            timestamp: parse_timestamp(&timestamp)?,
        });
    }
    Ok(turns)
}

/// A user's sessions, newest first.
pub fn list_sessions(conn: &Connection, user_id: UserId) -> StoreResult<Vec<SessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.created_at, COUNT(m.id)
         FROM chat_sessions s
         LEFT JOIN chat_messages m ON m.session_id = s.id
         WHERE s.user_id = ?1
         GROUP BY s.id
         ORDER BY s.created_at DESC, s.id DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut sessions = Vec::new();
    for row in rows {
        let (id, created_at, count) = row?;
        sessions.push(SessionRow {
            id,
            user_id,
            created_at: parse_timestamp(&created_at)?,
            message_count: count as usize,
        });
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::queries::users::create_user;
    use chrono::SubsecRound;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn history_round_trips_in_order() {
        let conn = conn();
        let user = create_user(&conn, "ada").unwrap();
        let session = create_session(&conn, user.id).unwrap();
        let now = Utc::now().trunc_subsecs(6);

        append_message(&conn, session, Role::Assistant, "What is a tuple?", &now).unwrap();
        append_message(&conn, session, Role::User, "Immutable.", &now).unwrap();

        let history = load_history(&conn, session).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Assistant);
        assert_eq!(history[1].content, "Immutable.");
        assert_eq!(history[0].timestamp, now);
    }

    #[test]
    fn unknown_session_is_rejected() {
        let conn = conn();
        let err = append_message(&conn, 99, Role::User, "hi", &Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownSession(99)));
        assert!(load_history(&conn, 99).unwrap().is_empty());
    }

    #[test]
    fn sessions_listed_newest_first_with_counts() {
        let conn = conn();
        let user = create_user(&conn, "ada").unwrap();
        let first = create_session(&conn, user.id).unwrap();
        let second = create_session(&conn, user.id).unwrap();
        append_message(&conn, first, Role::Assistant, "Q", &Utc::now()).unwrap();

        let sessions = list_sessions(&conn, user.id).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second);
        assert_eq!(sessions[0].message_count, 0);
        assert_eq!(sessions[1].message_count, 1);
    }

    #[test]
    fn sessions_require_a_user() {
        let conn = conn();
        assert!(create_session(&conn, 42).is_err());
    }
}
