// Paged collection against a real HTTP server.
// Run with: cargo test -p insights-fetch --test paging

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};

use insights_fetch::{FetchCause, FetchClient, PageCollector, RetryPolicy, Sleeper};

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

fn client(max_attempts: u32) -> FetchClient {
    let policy = RetryPolicy {
        max_attempts,
        backoff_cap_secs: 60,
        timeout: Duration::from_secs(5),
    };
    FetchClient::new(policy).with_sleeper(Arc::new(NoSleep))
}

fn rows(page: u32, n: u32) -> Vec<Value> {
    (0..n).map(|i| json!({ "id": format!("p{page}r{i}") })).collect()
}

#[test]
fn three_reported_pages_yield_thirty_rows_in_order() {
    let server = MockServer::start();

    let mocks: Vec<_> = (1..=3u32)
        .map(|page| {
            server.mock(|when, then| {
                when.method(GET)
                    .path("/v2/country")
                    .query_param("format", "json")
                    .query_param("page", page.to_string())
                    .query_param("per_page", "10");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!([
                        { "page": page, "pages": 3, "per_page": "10", "total": 30 },
                        rows(page, 10),
                    ]));
            })
        })
        .collect();

    let client = client(3);
    let collected = PageCollector::new(&client)
        .collect_all(&server.url("/v2/country?format=json"), 10)
        .unwrap();

    for mock in &mocks {
        mock.assert();
    }
    assert_eq!(collected.len(), 30);
    assert_eq!(collected[0]["id"], "p1r0");
    assert_eq!(collected[10]["id"], "p2r0");
    assert_eq!(collected[29]["id"], "p3r9");
}

#[test]
fn missing_page_count_stops_on_empty_page() {
    let server = MockServer::start();

    let first = server.mock(|when, then| {
        when.method(GET).path("/list").query_param("page", "1");
        then.status(200).json_body(json!([{ "total": 2 }, rows(1, 2)]));
    });
    let second = server.mock(|when, then| {
        when.method(GET).path("/list").query_param("page", "2");
        then.status(200).json_body(json!([{ "total": 2 }, []]));
    });

    let client = client(1);
    let collected = PageCollector::new(&client)
        .collect_all(&server.url("/list"), 2)
        .unwrap();

    first.assert();
    second.assert();
    assert_eq!(collected.len(), 2);
}

#[test]
fn malformed_tail_ends_collection_without_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/list").query_param("page", "1");
        then.status(200).json_body(json!([{ "page": 1, "pages": 5 }, rows(1, 4)]));
    });
    let tail = server.mock(|when, then| {
        when.method(GET).path("/list").query_param("page", "2");
        then.status(200)
            .json_body(json!([{ "message": [{ "id": "175", "value": "Invalid format" }] }]));
    });

    let client = client(1);
    let collected = PageCollector::new(&client)
        .collect_all(&server.url("/list"), 4)
        .unwrap();

    tail.assert_calls(1);
    assert_eq!(collected.len(), 4);
}

#[test]
fn server_errors_exhaust_retries() {
    let server = MockServer::start();

    let failing = server.mock(|when, then| {
        when.method(GET).path("/list");
        then.status(503);
    });

    let client = client(3);
    let err = PageCollector::new(&client)
        .collect_all(&server.url("/list"), 10)
        .unwrap_err();

    failing.assert_calls(3);
    assert_eq!(err.attempts, 3);
    assert_eq!(err.last_cause, FetchCause::Status(503));
}

#[test]
fn not_found_is_not_retried() {
    let server = MockServer::start();

    let missing = server.mock(|when, then| {
        when.method(GET).path("/list");
        then.status(404).body("no such listing");
    });

    let client = client(6);
    let err = PageCollector::new(&client)
        .collect_all(&server.url("/list"), 10)
        .unwrap_err();

    missing.assert_calls(1);
    assert!(err.is_rejected());
}
