//! Error types for the sync engine.

use delegation_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The feed answered 200 with a body that is not a delegation list.
    #[error("malformed feed response: {0}")]
    Decode(String),

    /// The feed answered with a status that is not retried.
    #[error("unexpected status {status} from feed: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Leading bytes of the response body.
        body: String,
    },

    /// Attempts or the wall-clock budget ran out.
    #[error("retries exhausted after {attempts} attempts in {elapsed:?} (last status: {})", fmt_status(.last_status))]
    RetriesExhausted {
        /// Requests issued.
        attempts: u32,
        /// Time spent, waits included.
        elapsed: Duration,
        /// Status of the last response, if any.
        last_status: Option<u16>,
        /// `Retry-After` hint that did not fit in the budget.
        retry_after: Option<Duration>,
    },

    /// Reading from or writing to the store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid engine or client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if the failure came from talking to the feed.
    pub fn is_external_api(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. }
                | SyncError::Decode(_)
                | SyncError::UnexpectedStatus { .. }
                | SyncError::RetriesExhausted { .. }
        )
    }

    /// Returns the upstream's requested quiet period, if it outlived the fetch.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::RetriesExhausted { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns true if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
