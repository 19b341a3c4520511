//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema {path} failed: {error}")]
    SchemaFailed { path: String, error: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_failed_error_display() {
        let err = SqliteError::SchemaFailed {
            path: "/tmp/schema.sql".to_string(),
            error: "near \"CREAT\": syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Schema /tmp/schema.sql failed: near \"CREAT\": syntax error"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let sqlite_err: SqliteError = io_err.into();
        assert!(sqlite_err.to_string().contains("file not found"));
    }
}
