//! Background execution of a [`SyncEngine`].

use crate::feed::DelegationFeed;
use crate::state::{SyncEngine, SyncState};
use delegation_store::DelegationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default bound on how long shutdown waits for the engine to exit.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a [`SyncEngine`] on a spawned task.
///
/// Stopping is cooperative: [`Poller::stop`] fires the cancellation token
/// and the engine exits at its next await point. [`Poller::shutdown`]
/// combines stop with a bounded join.
#[derive(Debug)]
pub struct Poller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawns the engine loop on the current runtime.
    pub fn start<F, S>(engine: Arc<SyncEngine<F, S>>) -> Self
    where
        F: DelegationFeed + 'static,
        S: DelegationStore + 'static,
    {
        Self::start_with_token(engine, CancellationToken::new())
    }

    /// Spawns the engine loop, stopping when `cancel` fires.
    pub fn start_with_token<F, S>(engine: Arc<SyncEngine<F, S>>, cancel: CancellationToken) -> Self
    where
        F: DelegationFeed + 'static,
        S: DelegationStore + 'static,
    {
        if engine.state() != SyncState::Idle {
            warn!(state = ?engine.state(), "starting a poller on an engine that already ran");
        }
        let token = cancel.clone();
        let handle = tokio::spawn(async move { engine.run(token).await });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Signals the engine to stop. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Returns a token that stops this poller when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns true once the engine task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the engine task to exit.
    ///
    /// Safe to call again after an outer timeout interrupted a previous
    /// call.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };
        let result = handle.await;
        self.handle = None;
        result
    }

    /// Stops the engine and waits up to `timeout` for it to exit.
    ///
    /// Returns false if the engine was still running when the timeout
    /// elapsed.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        self.stop();
        match tokio::time::timeout(timeout, self.join()).await {
            Ok(Ok(())) => {
                info!("poller stopped");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "poller task failed");
                true
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "poller did not stop in time");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::feed::MockFeed;
    use delegation_store::InMemoryStore;

    fn engine() -> Arc<SyncEngine<MockFeed, InMemoryStore>> {
        let config = SyncConfig::default().with_poll_interval(Duration::from_millis(20));
        Arc::new(SyncEngine::new(config, MockFeed::new(), InMemoryStore::new()))
    }

    #[tokio::test]
    async fn stop_then_join() {
        let engine = engine();
        let mut poller = Poller::start(Arc::clone(&engine));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!poller.is_finished());

        poller.stop();
        poller.join().await.unwrap();
        assert!(poller.is_finished());
        assert_eq!(engine.state(), SyncState::Stopped);

        // joining again is a no-op
        poller.join().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_within_timeout() {
        let engine = engine();
        let poller = Poller::start(Arc::clone(&engine));
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(poller.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await);
        assert_eq!(engine.state(), SyncState::Stopped);
    }

    #[tokio::test]
    async fn external_token_stops_poller() {
        let engine = engine();
        let cancel = CancellationToken::new();
        let mut poller = Poller::start_with_token(Arc::clone(&engine), cancel.child_token());

        cancel.cancel();
        poller.join().await.unwrap();
        assert_eq!(engine.state(), SyncState::Stopped);
    }
}
