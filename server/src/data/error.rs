//! Unified error type for data layer

use thiserror::Error;

use crate::data::sqlite::SqliteError;

/// Error type for store operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// Schema bootstrap failed
    #[error("Schema {path} failed: {error}")]
    SchemaFailed { path: String, error: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SqliteError> for DataError {
    fn from(e: SqliteError) -> Self {
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::SchemaFailed { path, error } => Self::SchemaFailed { path, error },
            SqliteError::Io(e) => Self::Io(e),
        }
    }
}
