//! A mock upstream feed.
//!
//! [`FeedServer`] answers `GET /v1/operations/delegations` the way the real
//! indexer does: it honours `id.gt` and `limit` and returns records in
//! ascending id order. Failures can be layered on top for retry tests.

use chrono::SecondsFormat;
use delegation_core::DelegationRecord;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path served by [`FeedServer`].
pub const FEED_PATH: &str = "/v1/operations/delegations";

/// Renders a record in the feed's wire format.
pub fn wire_json(record: &DelegationRecord) -> Value {
    json!({
        "type": "delegation",
        "id": record.source_id,
        "level": record.block_level,
        "timestamp": record.occurred_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "sender": { "address": record.delegator },
        "amount": record.amount,
        "status": "applied",
    })
}

struct PagedFeed {
    records: Arc<Mutex<Vec<DelegationRecord>>>,
}

impl Respond for PagedFeed {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut limit = usize::MAX;
        let mut since = 0i64;
        for (key, value) in request.url.query_pairs() {
            match key.as_ref() {
                "limit" => limit = value.parse().unwrap_or(limit),
                "id.gt" => since = value.parse().unwrap_or(since),
                _ => {}
            }
        }

        let page: Vec<Value> = self
            .records
            .lock()
            .iter()
            .filter(|r| r.source_id > since)
            .take(limit)
            .map(wire_json)
            .collect();
        ResponseTemplate::new(200).set_body_json(page)
    }
}

/// A running mock feed.
pub struct FeedServer {
    server: MockServer,
    records: Arc<Mutex<Vec<DelegationRecord>>>,
}

impl FeedServer {
    /// Starts a server serving `initial`.
    pub async fn start(initial: Vec<DelegationRecord>) -> Self {
        let server = MockServer::start().await;
        let records = Arc::new(Mutex::new(Vec::new()));

        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(PagedFeed {
                records: Arc::clone(&records),
            })
            .mount(&server)
            .await;

        let feed = Self { server, records };
        feed.push(initial);
        feed
    }

    /// Full URL of the delegation endpoint.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), FEED_PATH)
    }

    /// Appends records, keeping the feed ordered by id.
    pub fn push(&self, records: impl IntoIterator<Item = DelegationRecord>) {
        let mut all = self.records.lock();
        all.extend(records);
        all.sort_by_key(|r| r.source_id);
    }

    /// Answers the next `times` requests with `response` instead of data.
    pub async fn fail_next(&self, response: ResponseTemplate, times: u64) {
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(response)
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// The `id.gt` value of every request received, in order.
    pub async fn requested_cursors(&self) -> Vec<i64> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| {
                request
                    .url
                    .query_pairs()
                    .find(|(key, _)| key == "id.gt")
                    .and_then(|(_, value)| value.parse().ok())
            })
            .collect()
    }

    /// Number of requests received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// The underlying wiremock server.
    pub fn server(&self) -> &MockServer {
        &self.server
    }
}
