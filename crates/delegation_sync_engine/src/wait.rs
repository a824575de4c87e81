//! Cancellable waiting.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleeps for `wait`, or returns [`SyncError::Cancelled`] as soon as `cancel`
/// fires.
pub(crate) async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) -> SyncResult<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        _ = tokio::time::sleep(wait) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_millis(20), &cancel).await.is_ok());
    }

    #[tokio::test]
    async fn returns_immediately_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = std::time::Instant::now();
        let result = sleep_or_cancel(Duration::from_secs(30), &cancel).await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
