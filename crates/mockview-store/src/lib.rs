//! mockview-store — SQLite persistence for interview transcripts.
//!
//! A single connection sits behind an async mutex; every operation is a
//! short synchronous query run while holding it.

pub mod auth;
pub mod error;
pub mod migrations;
pub mod queries;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use mockview_core::model::{Exchange, Role, SessionId, StoredTurn, UserId};
use mockview_core::traits::Persistence;

pub use auth::SignedInUser;
pub use error::{StoreError, StoreResult};
pub use queries::records::InterviewRecord;
pub use queries::sessions::SessionRow;
pub use queries::users::User;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and bring its schema up to
    /// date.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::InvalidRow(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Self::initialize(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection and run `f` with it.
    pub async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let guard = self.conn.lock().await;
        f(&guard)
    }

    pub async fn create_user(&self, username: &str) -> StoreResult<User> {
        let user = self
            .with_conn(|conn| queries::users::create_user(conn, username))
            .await?;
        tracing::info!(user_id = user.id, username, "user created");
        Ok(user)
    }

    pub async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| queries::users::find_user(conn, username))
            .await
    }

    pub async fn find_active_user(&self, username: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| queries::users::find_active_user(conn, username))
            .await
    }

    pub async fn deactivate_user(&self, username: &str) -> StoreResult<bool> {
        self.with_conn(|conn| queries::users::deactivate_user(conn, username))
            .await
    }

    pub async fn list_sessions(&self, user_id: UserId) -> StoreResult<Vec<SessionRow>> {
        self.with_conn(|conn| queries::sessions::list_sessions(conn, user_id))
            .await
    }

    pub async fn session_owner(&self, session_id: SessionId) -> StoreResult<Option<UserId>> {
        self.with_conn(|conn| queries::sessions::session_owner(conn, session_id))
            .await
    }

    pub async fn list_records(
        &self,
        user_id: UserId,
        keyword: Option<&str>,
    ) -> StoreResult<Vec<InterviewRecord>> {
        self.with_conn(|conn| queries::records::list_records(conn, user_id, keyword))
            .await
    }
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn create_session(&self, user_id: UserId) -> anyhow::Result<SessionId> {
        Ok(self
            .with_conn(|conn| queries::sessions::create_session(conn, user_id))
            .await?)
    }

    async fn append_turn(
        &self,
        session_id: SessionId,
        sender: Role,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        Ok(self
            .with_conn(|conn| {
                queries::sessions::append_message(conn, session_id, sender, text, &timestamp)
            })
            .await?)
    }

    async fn load_history(&self, session_id: SessionId) -> anyhow::Result<Vec<StoredTurn>> {
        Ok(self
            .with_conn(|conn| queries::sessions::load_history(conn, session_id))
            .await?)
    }

    async fn save_exchange(
        &self,
        user_id: UserId,
        session_id: SessionId,
        exchange: &Exchange,
    ) -> anyhow::Result<()> {
        self.with_conn(|conn| queries::records::insert_record(conn, user_id, session_id, exchange))
            .await?;
        Ok(())
    }
}
