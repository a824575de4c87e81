//! End-to-end engine behaviour against a mock feed and a real store.

use delegation_core::Cursor;
use delegation_store::{DelegationStore, InMemoryStore, SqliteStore};
use delegation_sync_engine::{
    CancellationToken, MockFeed, Poller, RetryConfig, SyncConfig, SyncEngine, SyncState,
    TzktClient, DEFAULT_SHUTDOWN_TIMEOUT,
};
use delegation_testkit::{delegations, wire_json, FeedServer, TestStore};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(url: &str) -> SyncConfig {
    SyncConfig::new(url)
        .with_poll_interval(Duration::from_millis(50))
        .with_cycle_retry_delay(Duration::from_millis(10))
        .with_retry(RetryConfig::default().with_initial_backoff(Duration::from_millis(5)))
}

fn engine(config: SyncConfig, store: SqliteStore) -> SyncEngine<TzktClient, SqliteStore> {
    let client = TzktClient::new(&config).unwrap();
    SyncEngine::new(config, client, store)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn historical_sync_takes_ceil_n_over_p_cycles() {
    let feed = FeedServer::start(delegations(1..=2500)).await;
    let store = TestStore::memory().await;
    let engine = engine(config(&feed.url()), store.handle());

    let cycles = engine.catch_up(&CancellationToken::new()).await.unwrap();

    assert_eq!(cycles, 3);
    assert_eq!(store.count(None).await.unwrap(), 2500);
    assert_eq!(store.max_source_id().await.unwrap(), 2500);
    assert_eq!(feed.requested_cursors().await, vec![0, 1000, 2000]);
    assert_eq!(engine.stats().last_cursor, Cursor::new(2500));
}

#[tokio::test]
async fn resumes_from_stored_cursor() {
    let feed = FeedServer::start(delegations(1..=8)).await;
    let store = TestStore::memory().await;
    store.insert_batch(&delegations(1..=5)).await.unwrap();
    let engine = engine(config(&feed.url()), store.handle());

    let result = engine.sync_cycle(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.cursor_before, Cursor::new(5));
    assert_eq!(result.fetched, 3);
    assert_eq!(result.cursor_after, Cursor::new(8));
    assert_eq!(feed.requested_cursors().await, vec![5]);
}

#[tokio::test]
async fn redelivered_records_are_ignored() {
    let server = MockServer::start().await;
    let page: Vec<_> = delegations(1..=3).iter().map(wire_json).collect();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .mount(&server)
        .await;
    let store = TestStore::memory().await;
    let engine = engine(config(&server.uri()), store.handle());
    let cancel = CancellationToken::new();

    let first = engine.sync_cycle(&cancel).await.unwrap();
    let second = engine.sync_cycle(&cancel).await.unwrap();

    assert_eq!(first.inserted, 3);
    assert_eq!(second.fetched, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(store.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn failed_cycle_is_retried_after_delay() {
    let feed = FeedServer::start(delegations(1..=4)).await;
    feed.fail_next(ResponseTemplate::new(500), 1).await;
    let store = TestStore::memory().await;
    let engine = engine(
        config(&feed.url()).with_retry(RetryConfig::no_retry()),
        store.handle(),
    );

    let cycles = engine.catch_up(&CancellationToken::new()).await.unwrap();

    assert_eq!(cycles, 1);
    assert_eq!(engine.stats().failed_cycles, 1);
    assert_eq!(store.count(None).await.unwrap(), 4);
    assert_eq!(feed.request_count().await, 2);
}

#[tokio::test]
async fn poller_picks_up_new_records() {
    let feed = FeedServer::start(delegations(1..=10)).await;
    let store = TestStore::file().await;
    let engine = Arc::new(engine(config(&feed.url()), store.handle()));

    let poller = Poller::start(Arc::clone(&engine));
    wait_for(|| engine.state() == SyncState::SteadyPoll).await;
    assert_eq!(store.count(None).await.unwrap(), 10);

    feed.push(delegations(11..=15));
    let deadline = Instant::now() + Duration::from_secs(10);
    while store.count(None).await.unwrap() < 15 {
        assert!(Instant::now() < deadline, "new records were not ingested");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(poller.shutdown(DEFAULT_SHUTDOWN_TIMEOUT).await);
    assert_eq!(engine.state(), SyncState::Stopped);
    assert_eq!(store.max_source_id().await.unwrap(), 15);
}

#[tokio::test]
async fn shutdown_interrupts_rate_limit_wait() {
    let feed = FeedServer::start(delegations(1..=3)).await;
    feed.fail_next(ResponseTemplate::new(429).insert_header("Retry-After", "60"), 100)
        .await;
    let store = TestStore::memory().await;
    let engine = Arc::new(engine(config(&feed.url()), store.handle()));

    let poller = Poller::start(Arc::clone(&engine));
    wait_for(|| engine.state() == SyncState::HistoricalSync).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    assert!(poller.shutdown(Duration::from_secs(5)).await);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(engine.state(), SyncState::Stopped);
    assert_eq!(store.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn rate_limit_hint_beyond_budget_pauses_engine() {
    let feed = FeedServer::start(delegations(1..=3)).await;
    feed.fail_next(ResponseTemplate::new(429).insert_header("Retry-After", "300"), 100)
        .await;
    let store = TestStore::memory().await;
    let engine = Arc::new(engine(config(&feed.url()), store.handle()));

    let poller = Poller::start(Arc::clone(&engine));
    wait_for(|| engine.stats().failed_cycles == 1).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(feed.request_count().await, 1);
    assert_eq!(engine.stats().failed_cycles, 1);
    assert!(poller.shutdown(Duration::from_secs(5)).await);
    assert_eq!(store.count(None).await.unwrap(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn catch_up_needs_one_cycle_per_page(total in 0i64..200, page_size in 1usize..40) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (cycles, stored) = rt.block_on(async {
            let feed = MockFeed::with_page_size(page_size);
            feed.push_records(delegations(1..=total));
            let config = SyncConfig::default().with_page_size(page_size);
            let engine = SyncEngine::new(config, feed, InMemoryStore::new());
            let cycles = engine.catch_up(&CancellationToken::new()).await.unwrap();
            (cycles, engine.store().len())
        });

        let expected = (total as usize).div_ceil(page_size);
        prop_assert_eq!(cycles, expected);
        prop_assert_eq!(stored, total as usize);
    }
}
