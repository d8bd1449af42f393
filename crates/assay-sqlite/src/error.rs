//! Error types for the SQLite backend.

use assay_core::StageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("report not found: {0}")]
    NotFound(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

pub type SqliteResult<T> = Result<T, SqliteError>;

/// Local failures are not retryable except for lock contention.
impl From<SqliteError> for StageError {
    fn from(err: SqliteError) -> Self {
        match &err {
            SqliteError::Sqlite(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::DatabaseBusy
                    || code.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StageError::Transient(err.to_string())
            }
            _ => StageError::Unrecoverable(err.to_string()),
        }
    }
}
