//! Retry and decoding behaviour of the HTTP feed client.

use delegation_sync_engine::{
    CancellationToken, DelegationFeed, RetryConfig, SyncConfig, SyncError, TzktClient,
};
use delegation_testkit::{delegations, FeedServer};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryConfig {
    RetryConfig::default().with_initial_backoff(Duration::from_millis(10))
}

fn client_for(url: &str, retry: RetryConfig) -> TzktClient {
    let config = SyncConfig::new(url)
        .with_page_size(1000)
        .with_request_timeout(Duration::from_secs(5))
        .with_retry(retry);
    TzktClient::new(&config).unwrap()
}

#[tokio::test]
async fn sends_cursor_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/operations/delegations"))
        .and(query_param("limit", "1000"))
        .and(query_param("id.gt", "41"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(
        &format!("{}/v1/operations/delegations", server.uri()),
        fast_retry(),
    );
    let batch = client
        .fetch_batch(41, &CancellationToken::new())
        .await
        .unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn decodes_feed_page() {
    let feed = FeedServer::start(delegations(1..=5)).await;
    let client = client_for(&feed.url(), fast_retry());

    let batch = client
        .fetch_batch(2, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        batch.iter().map(|r| r.source_id).collect::<Vec<_>>(),
        vec![3, 4, 5]
    );
    assert_eq!(batch[0], delegation_testkit::delegation(3));
}

#[tokio::test]
async fn honours_retry_after_on_429() {
    let feed = FeedServer::start(delegations(1..=3)).await;
    feed.fail_next(ResponseTemplate::new(429).insert_header("Retry-After", "2"), 1)
        .await;
    let client = client_for(&feed.url(), fast_retry());

    let started = Instant::now();
    let batch = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(batch.len(), 3);
    assert!(elapsed >= Duration::from_millis(1900), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "waited {elapsed:?}");
    assert_eq!(feed.request_count().await, 2);
}

#[tokio::test]
async fn backs_off_on_503_without_hint() {
    let feed = FeedServer::start(delegations(1..=2)).await;
    feed.fail_next(ResponseTemplate::new(503), 2).await;
    let client = client_for(&feed.url(), fast_retry());

    let batch = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(feed.request_count().await, 3);
}

#[tokio::test]
async fn exhausts_attempts_on_persistent_5xx() {
    let feed = FeedServer::start(delegations(1..=2)).await;
    feed.fail_next(ResponseTemplate::new(500), 100).await;
    let client = client_for(&feed.url(), fast_retry());

    let err = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SyncError::RetriesExhausted {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 5);
            assert_eq!(last_status, Some(500));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(feed.request_count().await, 5);
}

#[tokio::test]
async fn client_error_fails_fast_with_capped_body() {
    let feed = FeedServer::start(Vec::new()).await;
    feed.fail_next(ResponseTemplate::new(400).set_body_string("x".repeat(10_000)), 1)
        .await;
    let client = client_for(&feed.url(), fast_retry());

    let err = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        SyncError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body.len(), 4096);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(feed.request_count().await, 1);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let feed = FeedServer::start(Vec::new()).await;
    feed.fail_next(ResponseTemplate::new(200).set_body_string("{\"not\": \"a list\"}"), 1)
        .await;
    let client = client_for(&feed.url(), fast_retry());

    let err = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)), "{err}");
    assert!(err.is_external_api());
    assert_eq!(feed.request_count().await, 1);
}

#[tokio::test]
async fn unreachable_feed_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = client_for(
        &format!("http://127.0.0.1:{port}/v1/operations/delegations"),
        fast_retry(),
    );
    let err = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }), "{err}");
}

#[tokio::test]
async fn wait_beyond_budget_is_not_started() {
    let feed = FeedServer::start(Vec::new()).await;
    feed.fail_next(ResponseTemplate::new(429).insert_header("Retry-After", "30"), 10)
        .await;
    let retry = fast_retry().with_max_total_wait(Duration::from_secs(2));
    let client = client_for(&feed.url(), retry);

    let started = Instant::now();
    let err = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        err,
        SyncError::RetriesExhausted {
            attempts: 1,
            last_status: Some(429),
            ..
        }
    ));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn budget_bounds_slow_responses() {
    let feed = FeedServer::start(Vec::new()).await;
    feed.fail_next(
        ResponseTemplate::new(500).set_delay(Duration::from_millis(900)),
        100,
    )
    .await;
    let retry = fast_retry().with_max_total_wait(Duration::from_secs(1));
    let client = client_for(&feed.url(), retry);

    let started = Instant::now();
    let err = client
        .fetch_batch(0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_millis(1500), "{:?}", started.elapsed());
    match err {
        SyncError::RetriesExhausted {
            attempts,
            last_status,
            retry_after,
            ..
        } => {
            assert!((1..=2).contains(&attempts), "{attempts}");
            assert_eq!(last_status, Some(500));
            assert_eq!(retry_after, None);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancellation_interrupts_backoff() {
    let feed = FeedServer::start(Vec::new()).await;
    feed.fail_next(ResponseTemplate::new(503).insert_header("Retry-After", "30"), 10)
        .await;
    let client = client_for(&feed.url(), fast_retry());
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let err = client.fetch_batch(0, &cancel).await.unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(feed.request_count().await, 1);
}
