//! Run command implementation.

use super::open_store;
use delegation_sync_engine::{Poller, SyncConfig, SyncEngine, TzktClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs the sync engine until Ctrl-C, then shuts it down.
pub async fn run(
    path: &Path,
    config: SyncConfig,
    shutdown_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path).await?;
    let client = TzktClient::new(&config)?;
    info!(
        db = %path.display(),
        feed = client.feed_url(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "starting delegation sync"
    );

    let engine = Arc::new(SyncEngine::new(config, client, store.clone()));
    let poller = Poller::start(Arc::clone(&engine));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    if !poller.shutdown(shutdown_timeout).await {
        warn!("exiting with the sync engine still running");
    }

    let stats = engine.stats();
    info!(
        cycles = stats.cycles_completed,
        failed_cycles = stats.failed_cycles,
        inserted = stats.records_inserted,
        cursor = %stats.last_cursor,
        "sync stopped"
    );
    store.close().await;
    Ok(())
}
