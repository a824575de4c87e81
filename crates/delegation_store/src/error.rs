//! Error types for store operations.

use delegation_core::ValidationError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller input was rejected before touching the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A query or transaction failed.
    #[error("database error during {operation}: {source}")]
    Database {
        /// What the store was doing.
        operation: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A filtered read matched no rows. Not a failure.
    #[error("no delegations found")]
    NoRows,

    /// A persisted row could not be decoded.
    #[error("corrupted row: {0}")]
    Corrupted(String),

    /// Schema migration failed.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An I/O error occurred while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Wraps a driver error with the operation that produced it.
    pub fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }

    /// Returns true for caller-input errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Returns true for the empty-result signal.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, StoreError::NoRows)
    }
}
