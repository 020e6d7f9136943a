//! Schema migrations using PRAGMA user_version.

use rusqlite::Connection;

use crate::error::{StoreError, StoreResult};

const V001_INITIAL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_sessions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON chat_sessions(user_id);

CREATE TABLE IF NOT EXISTS chat_messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  INTEGER NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
    sender      TEXT NOT NULL CHECK (sender IN ('user', 'assistant')),
    message     TEXT NOT NULL,
    timestamp   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_session ON chat_messages(session_id);
";

const V002_INTERVIEW_RECORDS: &str = "
CREATE TABLE IF NOT EXISTS interview_records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    session_id  INTEGER NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
    question    TEXT NOT NULL,
    context     TEXT NOT NULL,
    answer      TEXT NOT NULL,
    feedback    TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_user ON interview_records(user_id);
";

const MIGRATIONS: &[(&str, u32)] = &[(V001_INITIAL, 1), (V002_INTERVIEW_RECORDS, 2)];

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let current = current_version(conn)?;

    for (sql, version) in MIGRATIONS {
        if current < *version {
            conn.execute_batch(sql)
                .and_then(|_| conn.pragma_update(None, "user_version", version))
                .map_err(|e| StoreError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
            tracing::info!(version, "applied migration");
        }
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'chat_sessions', 'chat_messages', 'interview_records')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }
}
