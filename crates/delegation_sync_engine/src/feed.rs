//! Feed abstraction for the sync engine.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use delegation_core::{DelegationRecord, FEED_PAGE_SIZE};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// A source of delegation records ordered by `source_id`.
///
/// This trait abstracts the upstream indexer so the engine can be driven
/// by the HTTP client in production and by [`MockFeed`] in tests.
#[async_trait]
pub trait DelegationFeed: Send + Sync {
    /// Returns up to one page of records with `source_id > since_id`,
    /// in ascending `source_id` order.
    ///
    /// Implementations must return [`SyncError::Cancelled`] promptly once
    /// `cancel` fires, including while waiting between retries.
    async fn fetch_batch(
        &self,
        since_id: i64,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<DelegationRecord>>;
}

/// An in-memory feed for testing.
///
/// Serves records from an append-only list. Scripted failures are returned
/// (oldest first) before any further data is served.
#[derive(Debug)]
pub struct MockFeed {
    page_size: usize,
    records: Mutex<Vec<DelegationRecord>>,
    failures: Mutex<VecDeque<SyncError>>,
    requests: Mutex<Vec<i64>>,
}

impl MockFeed {
    /// Creates an empty feed serving pages of the default size.
    pub fn new() -> Self {
        Self::with_page_size(FEED_PAGE_SIZE)
    }

    /// Creates an empty feed serving pages of `page_size` records.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            records: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Appends records to the feed, keeping it ordered by `source_id`.
    pub fn push_records(&self, records: impl IntoIterator<Item = DelegationRecord>) {
        let mut all = self.records.lock();
        all.extend(records);
        all.sort_by_key(|r| r.source_id);
    }

    /// Queues an error for a future fetch.
    pub fn push_failure(&self, error: SyncError) {
        self.failures.lock().push_back(error);
    }

    /// Returns the `since_id` of every fetch, in call order.
    pub fn requests(&self) -> Vec<i64> {
        self.requests.lock().clone()
    }

    /// Returns the number of fetches made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of records the feed holds.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if the feed holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DelegationFeed for MockFeed {
    async fn fetch_batch(
        &self,
        since_id: i64,
        cancel: &CancellationToken,
    ) -> SyncResult<Vec<DelegationRecord>> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.requests.lock().push(since_id);

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| r.source_id > since_id)
            .take(self.page_size)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: i64) -> DelegationRecord {
        let at = Utc.with_ymd_and_hms(2022, 5, 1, 0, 0, 0).unwrap();
        DelegationRecord::new(id, at, 10, format!("tz1mock{id}"), id)
    }

    #[tokio::test]
    async fn serves_pages_beyond_cursor() {
        let feed = MockFeed::with_page_size(2);
        feed.push_records([record(3), record(1), record(2)]);
        let cancel = CancellationToken::new();

        let first = feed.fetch_batch(0, &cancel).await.unwrap();
        assert_eq!(
            first.iter().map(|r| r.source_id).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let second = feed.fetch_batch(2, &cancel).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].source_id, 3);

        assert!(feed.fetch_batch(3, &cancel).await.unwrap().is_empty());
        assert_eq!(feed.requests(), vec![0, 2, 3]);
    }

    #[tokio::test]
    async fn scripted_failures_come_first() {
        let feed = MockFeed::new();
        feed.push_records([record(1)]);
        feed.push_failure(SyncError::transport("connection reset"));
        let cancel = CancellationToken::new();

        assert!(feed.fetch_batch(0, &cancel).await.is_err());
        assert_eq!(feed.fetch_batch(0, &cancel).await.unwrap().len(), 1);
        assert_eq!(feed.request_count(), 2);
    }

    #[tokio::test]
    async fn cancelled_fetch_is_not_counted() {
        let feed = MockFeed::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = feed.fetch_batch(0, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(feed.request_count(), 0);
    }
}
