//! Error types for the query service.

use delegation_core::ValidationError;
use delegation_store::StoreError;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while serving a page.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The request parameters were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed to answer.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => QueryError::Validation(e),
            other => QueryError::Store(other),
        }
    }
}

impl QueryError {
    /// Returns true if the caller's input was at fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, QueryError::Validation(_))
    }

    /// HTTP status an edge should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::Validation(_) => 400,
            QueryError::Store(_) => 500,
        }
    }

    /// Message safe to show to a caller.
    pub fn public_message(&self) -> String {
        match self {
            QueryError::Validation(e) => format!("Invalid request parameters: {e}"),
            QueryError::Store(StoreError::Database { .. }) => "Database error".to_string(),
            QueryError::Store(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegation_store::{DelegationStore, InMemoryStore};

    #[test]
    fn store_validation_stays_validation() {
        let err = QueryError::from(StoreError::Validation(ValidationError::new(
            "limit",
            "must be positive",
        )));
        assert!(err.is_validation());
        assert_eq!(err.status_code(), 400);
        assert!(err.public_message().contains("limit"));
    }

    #[tokio::test]
    async fn database_errors_hide_detail() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let err = QueryError::from(store.max_source_id().await.unwrap_err());
        assert!(!err.is_validation());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Database error");
    }

    #[test]
    fn other_store_errors_are_internal() {
        let err = QueryError::from(StoreError::Corrupted("bad timestamp".into()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
