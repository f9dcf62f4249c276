//! Database error types.

use lookout_core::LookoutError;
use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create the database.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// A stored value could not be turned back into a domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// Requested record was not found.
    #[error("{0}")]
    NotFound(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DatabaseError> for LookoutError {
    fn from(err: DatabaseError) -> Self {
        LookoutError::Persistence(err.to_string())
    }
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_persistence_error() {
        let err: LookoutError = DatabaseError::Decode("bad platform 'myspace'".to_string()).into();
        assert!(matches!(err, LookoutError::Persistence(ref m) if m.contains("myspace")));
    }
}
