use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::models::EntityKind;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Constraint violation: {0}")]
    Constraint(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("No transaction is open on this session")]
    NoTransaction,

    #[error("Session already closed")]
    SessionClosed,

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => StoreError::Constraint(err),
                _ => StoreError::Database(err),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Connection(err),
            _ => StoreError::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_connection_failures() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_connection_failure());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_connection_failure());
    }

    #[test]
    fn test_row_not_found_is_generic_database_error() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_not_found_message_names_the_kind() {
        let err = StoreError::NotFound {
            kind: EntityKind::MedicalRecord,
            id: 4,
        };
        assert_eq!(err.to_string(), "medical record 4 not found");
    }
}
