//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use delegation_core::FEED_PAGE_SIZE;
use std::time::Duration;

/// Public delegation endpoint of the TzKT indexer.
pub const DEFAULT_FEED_URL: &str = "https://api.tzkt.io/v1/operations/delegations";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Full URL of the delegation feed endpoint.
    pub feed_url: String,
    /// Records requested per fetch. A shorter page means caught up.
    pub page_size: usize,
    /// Period between steady-state catch-ups.
    pub poll_interval: Duration,
    /// Pause after a failed cycle before the next one.
    pub cycle_retry_delay: Duration,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
    /// Retry policy for a single fetch.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration for the given feed with default timings.
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            page_size: FEED_PAGE_SIZE,
            poll_interval: Duration::from_secs(60),
            cycle_retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the fetch page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the steady-state poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the delay after a failed cycle.
    pub fn with_cycle_retry_delay(mut self, delay: Duration) -> Self {
        self.cycle_retry_delay = delay;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.feed_url.trim().is_empty() {
            return Err(SyncError::Config("feed url must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(SyncError::Config("page size must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(SyncError::Config("poll interval must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config("at least one attempt is required".into()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL)
    }
}

/// Retry policy for fetching one batch.
///
/// Backoff starts at `initial_backoff` and doubles every time it is used.
/// A `Retry-After` hint replaces the backoff for that wait without
/// advancing it.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of requests per fetch.
    pub max_attempts: u32,
    /// First backoff delay.
    pub initial_backoff: Duration,
    /// Wall-clock budget for one fetch, waits included.
    pub max_total_wait: Duration,
    /// Bytes of an error response body kept for diagnostics.
    pub max_error_body: usize,
}

impl RetryConfig {
    /// Creates a configuration with the given attempt bound.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_secs(1),
            max_total_wait: Duration::from_secs(120),
            max_error_body: 4096,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self::new(1).with_initial_backoff(Duration::ZERO)
    }

    /// Sets the initial backoff.
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_max_total_wait(mut self, budget: Duration) -> Self {
        self.max_total_wait = budget;
        self
    }

    /// Sets the error body cap.
    pub fn with_max_error_body(mut self, bytes: usize) -> Self {
        self.max_error_body = bytes;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.cycle_retry_delay, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("http://localhost:8080/delegations")
            .with_page_size(10)
            .with_poll_interval(Duration::from_millis(50))
            .with_cycle_retry_delay(Duration::from_millis(5))
            .with_request_timeout(Duration::from_secs(2));

        assert_eq!(config.feed_url, "http://localhost:8080/delegations");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.cycle_retry_delay, Duration::from_millis(5));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(SyncConfig::new("  ").validate().is_err());
        assert!(SyncConfig::default().with_page_size(0).validate().is_err());
        assert!(SyncConfig::default()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SyncConfig::default()
            .with_retry(RetryConfig::new(0))
            .validate()
            .is_err());
    }

    #[test]
    fn retry_config_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_backoff, Duration::from_secs(1));
        assert_eq!(retry.max_total_wait, Duration::from_secs(120));
        assert_eq!(retry.max_error_body, 4096);
    }

    #[test]
    fn retry_config_no_retry() {
        let retry = RetryConfig::no_retry();
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.initial_backoff, Duration::ZERO);
    }
}
