//! HTTP feed client.
//!
//! [`TzktClient`] fetches pages from a TzKT-compatible delegation endpoint
//! and owns the per-fetch retry policy:
//!
//! - `429` and `503` honour a positive `Retry-After` hint (delta seconds
//!   or HTTP-date), falling back to exponential backoff
//! - other `5xx` use exponential backoff
//! - any other non-`200` status fails immediately with a capped body
//! - a transport failure fails immediately
//!
//! Attempts are bounded by [`RetryConfig::max_attempts`] and by a
//! wall-clock budget that covers requests as well as waits. A wait that
//! would overrun the budget is not started; an unmet `Retry-After` hint is
//! handed back in [`SyncError::RetriesExhausted`] for the caller to honour.

use crate::config::{RetryConfig, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::feed::DelegationFeed;
use crate::wait::sleep_or_cancel;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use delegation_core::DelegationRecord;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One delegation as served by the feed.
#[derive(Debug, Deserialize)]
struct WireDelegation {
    id: i64,
    timestamp: DateTime<Utc>,
    amount: i64,
    sender: WireSender,
    level: i64,
}

#[derive(Debug, Deserialize)]
struct WireSender {
    address: String,
}

impl From<WireDelegation> for DelegationRecord {
    fn from(wire: WireDelegation) -> Self {
        DelegationRecord::new(
            wire.id,
            wire.timestamp,
            wire.amount,
            wire.sender.address,
            wire.level,
        )
    }
}

/// Exponential backoff that doubles each time a delay is taken.
#[derive(Debug)]
struct Backoff {
    next: Duration,
}

impl Backoff {
    fn new(initial: Duration) -> Self {
        Self { next: initial }
    }

    fn take(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2);
        delay
    }
}

/// Obsolete HTTP-date forms recipients must still accept (RFC 850, asctime).
const OBSOLETE_HTTP_DATES: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }
    OBSOLETE_HTTP_DATES
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|at| at.and_utc())
}

/// Parses a `Retry-After` value. Non-positive hints yield `None`.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
    }
    parse_http_date(value)?
        .signed_duration_since(now)
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

/// Reads at most `cap` bytes of the body. Read errors end the body early.
async fn read_capped_body(mut response: reqwest::Response, cap: usize) -> String {
    let mut body = Vec::with_capacity(cap.min(1024));
    while body.len() < cap {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(cap - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// HTTP implementation of [`DelegationFeed`].
#[derive(Debug, Clone)]
pub struct TzktClient {
    client: reqwest::Client,
    feed_url: Url,
    page_size: usize,
    retry: RetryConfig,
}

impl TzktClient {
    /// Creates a client from the sync configuration.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let feed_url = Url::parse(&config.feed_url)
            .map_err(|e| SyncError::Config(format!("invalid feed url {:?}: {e}", config.feed_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("delegation-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            feed_url,
            page_size: config.page_size,
            retry: config.retry.clone(),
        })
    }

    /// Returns the feed URL.
    pub fn feed_url(&self) -> &str {
        self.feed_url.as_str()
    }

    async fn fetch_with_retry(
        &self,
        since_id: i64,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<DelegationRecord>> {
        let started = Instant::now();
        let mut backoff = Backoff::new(self.retry.initial_backoff);
        let mut attempts = 0u32;
        let mut last_status = None;
        let mut unmet_hint = None;

        while attempts < self.retry.max_attempts {
            attempts += 1;
            unmet_hint = None;
            let request = self.client.get(self.feed_url.clone()).query(&[
                ("limit", self.page_size.to_string()),
                ("id.gt", since_id.to_string()),
            ]);

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                sent = timeout(self.budget_left(started), request.send()) => sent,
            };
            let Ok(sent) = sent else {
                warn!(attempt = attempts, "feed request outlived the retry budget");
                break;
            };
            let response = sent.map_err(|e| SyncError::transport(e.to_string()))?;

            let status = response.status();
            if status == StatusCode::OK {
                let body = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                    body = timeout(self.budget_left(started), response.bytes()) => body,
                };
                let Ok(body) = body else {
                    warn!(attempt = attempts, "feed body outlived the retry budget");
                    break;
                };
                let body = body.map_err(|e| SyncError::transport(e.to_string()))?;
                let wire: Vec<WireDelegation> = serde_json::from_slice(&body)
                    .map_err(|e| SyncError::Decode(e.to_string()))?;
                debug!(since_id, count = wire.len(), attempts, "fetched delegation batch");
                return Ok(wire.into_iter().map(DelegationRecord::from).collect());
            }

            last_status = Some(status.as_u16());
            let wait = if status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::SERVICE_UNAVAILABLE
            {
                unmet_hint = retry_after(response.headers());
                unmet_hint.unwrap_or_else(|| backoff.take())
            } else if status.is_server_error() {
                backoff.take()
            } else {
                let body = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                    body = timeout(
                        self.budget_left(started),
                        read_capped_body(response, self.retry.max_error_body),
                    ) => body.unwrap_or_default(),
                };
                return Err(SyncError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                });
            };

            if attempts >= self.retry.max_attempts {
                break;
            }
            if wait >= self.budget_left(started) {
                warn!(
                    status = status.as_u16(),
                    wait_ms = wait.as_millis() as u64,
                    "retry wait exceeds the remaining budget"
                );
                break;
            }

            warn!(
                status = status.as_u16(),
                attempt = attempts,
                wait_ms = wait.as_millis() as u64,
                "feed request failed, retrying"
            );
            sleep_or_cancel(wait, cancel).await?;
        }

        Err(SyncError::RetriesExhausted {
            attempts,
            elapsed: started.elapsed(),
            last_status,
            retry_after: unmet_hint,
        })
    }

    fn budget_left(&self, started: Instant) -> Duration {
        self.retry.max_total_wait.saturating_sub(started.elapsed())
    }
}

#[async_trait]
impl DelegationFeed for TzktClient {
    async fn fetch_batch(
        &self,
        since_id: i64,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<DelegationRecord>> {
        self.fetch_with_retry(since_id, cancel).await
    }
}
