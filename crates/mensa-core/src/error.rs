//! Error types for Mensa

use thiserror::Error;

/// Result type alias using Mensa's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Mensa error types
///
/// Validation errors are recoverable and surfaced to the caller; database
/// errors propagate from the driver unmodified. Connection failures are
/// reported by `storage::Database::new` as an `Err` and the binary decides
/// whether to exit.
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = Error::Validation("senderId must not be empty".to_string());
        assert!(err.to_string().contains("validation failed"));
        assert!(err.to_string().contains("senderId"));
    }

    #[test]
    fn test_database_error_from_sqlx() {
        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Database(_)));
    }
}
