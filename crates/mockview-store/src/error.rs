//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("no active user named '{0}'")]
    UnknownUser(String),

    #[error("session {0} does not exist")]
    UnknownSession(i64),

    #[error("invalid stored value: {0}")]
    InvalidRow(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
