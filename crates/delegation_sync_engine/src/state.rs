//! Sync engine state machine.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::feed::DelegationFeed;
use crate::wait::sleep_or_cancel;
use delegation_core::Cursor;
use delegation_store::DelegationStore;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine has not been started.
    Idle,
    /// Engine is catching up on the feed's history.
    HistoricalSync,
    /// Engine is caught up and polls on a fixed period.
    SteadyPoll,
    /// Engine observed cancellation and exited.
    Stopped,
}

impl SyncState {
    /// Returns true while the engine loop is running.
    pub fn is_running(&self) -> bool {
        matches!(self, SyncState::HistoricalSync | SyncState::SteadyPoll)
    }

    /// Returns true once the engine can no longer run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Stopped)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of cycles that failed.
    pub failed_cycles: u64,
    /// Total number of records returned by the feed.
    pub records_fetched: u64,
    /// Total number of records newly stored.
    pub records_inserted: u64,
    /// Cursor after the last successful cycle.
    pub last_cursor: Cursor,
    /// Last successful cycle time.
    pub last_success: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Cursor the fetch started from.
    pub cursor_before: Cursor,
    /// Cursor after the batch was stored.
    pub cursor_after: Cursor,
    /// Number of records the feed returned.
    pub fetched: usize,
    /// Number of records that were new to the store.
    pub inserted: u64,
    /// Whether the batch was shorter than a full page.
    pub caught_up: bool,
    /// Duration of the sync cycle.
    pub duration: Duration,
}

/// The sync engine keeps a store in step with an upstream feed.
///
/// The engine moves `Idle -> HistoricalSync -> SteadyPoll -> Stopped`.
/// Historical sync runs cycles back to back until a short page is seen.
/// Steady polling then runs the same catch-up once per
/// [`SyncConfig::poll_interval`], the first one a full period after
/// entering the state. Cancellation moves the engine to `Stopped` from
/// anywhere.
pub struct SyncEngine<F: DelegationFeed, S: DelegationStore> {
    config: SyncConfig,
    feed: Arc<F>,
    store: Arc<S>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<F: DelegationFeed, S: DelegationStore> SyncEngine<F, S> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, feed: F, store: S) -> Self {
        Self {
            config,
            feed: Arc::new(feed),
            store: Arc::new(store),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the feed.
    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Gets the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn set_state(&self, state: SyncState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            info!(from = ?previous, to = ?state, "sync state changed");
        }
    }

    /// Performs one cycle: read the cursor, fetch the next page, store it.
    ///
    /// Empty batches are a successful no-op.
    pub async fn sync_cycle(&self, cancel: &CancellationToken) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();
        let cursor_before = Cursor::new(self.store.max_source_id().await?);

        let batch = self.feed.fetch_batch(cursor_before.value(), cancel).await?;
        let fetched = batch.len();

        let inserted = if batch.is_empty() {
            0
        } else {
            self.store.insert_batch(&batch).await?
        };

        let cursor_after = match batch.iter().map(|r| r.source_id).max() {
            Some(max) if max > cursor_before.value() => Cursor::new(max),
            _ => cursor_before,
        };

        let result = SyncCycleResult {
            cursor_before,
            cursor_after,
            fetched,
            inserted,
            caught_up: fetched < self.config.page_size,
            duration: start.elapsed(),
        };

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.records_fetched += fetched as u64;
            stats.records_inserted += inserted;
            stats.last_cursor = cursor_after;
            stats.last_success = Some(Instant::now());
            stats.last_error = None;
        }

        debug!(
            cursor_before = %cursor_before,
            cursor_after = %cursor_after,
            fetched,
            inserted,
            "sync cycle completed"
        );
        Ok(result)
    }

    /// Runs cycles until a short page is seen.
    ///
    /// Failed cycles are logged and retried after
    /// [`SyncConfig::cycle_retry_delay`], or after the feed's `Retry-After`
    /// hint when that is longer. The only error returned is
    /// [`SyncError::Cancelled`]. Returns the number of cycles that
    /// fetched at least one record.
    pub async fn catch_up(&self, cancel: &CancellationToken) -> SyncResult<usize> {
        let mut non_empty = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            match self.sync_cycle(cancel).await {
                Ok(result) => {
                    if result.fetched > 0 {
                        non_empty += 1;
                    }
                    if result.caught_up {
                        return Ok(non_empty);
                    }
                }
                Err(e) if e.is_cancelled() || cancel.is_cancelled() => {
                    return Err(SyncError::Cancelled);
                }
                Err(e) => {
                    let delay = self.retry_delay(&e);
                    self.record_failure(&e, delay);
                    sleep_or_cancel(delay, cancel).await?;
                }
            }
        }
    }

    /// Runs the engine until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        self.set_state(SyncState::HistoricalSync);
        info!(feed = %self.config.feed_url, "starting historical sync");

        match self.catch_up(&cancel).await {
            Ok(cycles) => info!(cycles, "historical sync complete"),
            Err(_) => {
                self.set_state(SyncState::Stopped);
                return;
            }
        }

        self.set_state(SyncState::SteadyPoll);
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.catch_up(&cancel).await {
                Ok(cycles) if cycles > 0 => info!(cycles, "ingested new delegations"),
                Ok(_) => {}
                Err(_) => break,
            }
        }

        self.set_state(SyncState::Stopped);
        info!("sync engine stopped");
    }

    /// Delay before the next cycle, stretched to any unmet `Retry-After`.
    fn retry_delay(&self, error: &SyncError) -> Duration {
        error
            .retry_after()
            .map_or(self.config.cycle_retry_delay, |hint| {
                hint.max(self.config.cycle_retry_delay)
            })
    }

    fn record_failure(&self, error: &SyncError, delay: Duration) {
        warn!(
            state = ?self.state(),
            error = %error,
            external = error.is_external_api(),
            retry_in_ms = delay.as_millis() as u64,
            "sync cycle failed"
        );
        let mut stats = self.stats.write();
        stats.failed_cycles += 1;
        stats.last_error = Some(error.to_string());
    }
}
