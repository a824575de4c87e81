//! Sync-once command implementation.

use super::open_store;
use delegation_store::SqliteStore;
use delegation_sync_engine::{
    CancellationToken, DelegationFeed, SyncConfig, SyncEngine, SyncError, TzktClient,
};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Outcome of a one-shot catch-up.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SyncOnceResult {
    /// Cycles run, including the final short one.
    pub cycles: usize,
    /// Records returned by the feed.
    pub fetched: u64,
    /// Records new to the store.
    pub inserted: u64,
    /// Highest stored `source_id` afterwards.
    pub cursor: i64,
}

/// Runs cycles until caught up, stopping at the first failure.
///
/// Unlike the long-running engine, failures are not retried here so the
/// command can be scheduled externally.
pub async fn catch_up<F: DelegationFeed>(
    engine: &SyncEngine<F, SqliteStore>,
    cancel: &CancellationToken,
) -> Result<SyncOnceResult, SyncError> {
    let mut result = SyncOnceResult {
        cycles: 0,
        fetched: 0,
        inserted: 0,
        cursor: 0,
    };
    loop {
        let cycle = engine.sync_cycle(cancel).await?;
        result.cycles += 1;
        result.fetched += cycle.fetched as u64;
        result.inserted += cycle.inserted;
        result.cursor = cycle.cursor_after.value();
        if cycle.caught_up {
            return Ok(result);
        }
    }
}

/// Runs the sync-once command.
pub async fn run(path: &Path, config: SyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path).await?;
    let client = TzktClient::new(&config)?;
    let engine = SyncEngine::new(config, client, store.clone());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = catch_up(&engine, &cancel).await;
    interrupt.abort();
    store.close().await;

    match outcome {
        Ok(result) => {
            info!(cycles = result.cycles, inserted = result.inserted, "caught up");
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            println!("Interrupted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegation_store::DelegationStore;
    use delegation_sync_engine::MockFeed;
    use delegation_testkit::{delegations, TestStore};

    #[tokio::test]
    async fn catches_up_in_pages() {
        let store = TestStore::memory().await;
        let feed = MockFeed::with_page_size(4);
        feed.push_records(delegations(1..=10));
        let config = SyncConfig::default().with_page_size(4);
        let engine = SyncEngine::new(config, feed, store.handle());

        let result = catch_up(&engine, &CancellationToken::new()).await.unwrap();
        assert_eq!(
            result,
            SyncOnceResult {
                cycles: 3,
                fetched: 10,
                inserted: 10,
                cursor: 10,
            }
        );
        assert_eq!(store.count(None).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let store = TestStore::memory().await;
        let feed = MockFeed::with_page_size(4);
        feed.push_records(delegations(1..=10));
        feed.push_failure(SyncError::transport("connection refused"));
        let engine = SyncEngine::new(SyncConfig::default().with_page_size(4), feed, store.handle());

        let err = catch_up(&engine, &CancellationToken::new()).await.unwrap_err();
        assert!(err.is_external_api());
        assert_eq!(store.count(None).await.unwrap(), 0);
    }
}
