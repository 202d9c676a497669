//! Integration tests for middleware over the real transport.

use std::sync::Arc;
use std::time::Duration;

use spool::middleware::{BearerAuthLayer, RetryConfig};
use spool::{Executor, HttpClientExt, HyperTransport, MemoryStore, StatusCodeRange};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

fn url(server: &MockServer, path: &str) -> String {
    format!("{}{path}", server.uri())
}

fn quick_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::builder()
        .max_retries(max_retries)
        .delay_min(Duration::from_millis(5))
        .delay_max(Duration::from_millis(20))
        .build()
}

/// Test that bearer auth middleware adds Authorization header.
#[tokio::test]
async fn test_bearer_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/protected"))
        .and(header("Authorization", "Bearer my-secret-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"user": "alice"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = Executor::builder(HyperTransport::new())
        .with_bearer_auth("my-secret-token")
        .build();

    let response = executor.get(&url(&mock_server, "/protected")).await.expect("response");

    assert!(response.is_success());
}

/// Test static and JSON headers together with logging.
#[tokio::test]
async fn test_headers_and_logging() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/headers"))
        .and(header("X-Client", "spool"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = Executor::builder(HyperTransport::new())
        .with_debug_logging()
        .with_header("X-Client", "spool")
        .with_json_headers()
        .build();

    let response = executor.get(&url(&mock_server, "/headers")).await.expect("response");

    assert!(response.is_success());
}

/// Test that no retries happen for statuses outside the retry ranges.
#[tokio::test]
async fn test_no_retry_outside_ranges() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/not-found"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = RetryConfig::builder()
        .max_retries(3)
        .retry_on(StatusCodeRange::SERVER_ERRORS)
        .build();
    let executor = Executor::builder(HyperTransport::new()).with_retry(config).build();

    let response = executor.get(&url(&mock_server, "/not-found")).await.expect("response");

    assert_eq!(response.status(), 404);
}

/// Test retry exhaustion on server error (5xx).
#[tokio::test]
async fn test_retry_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3) // Initial + 2 retries
        .mount(&mock_server)
        .await;

    let executor = Executor::builder(HyperTransport::new())
        .with_retry(quick_retry(2))
        .build();

    let err = executor.get(&url(&mock_server, "/error")).await.expect_err("exhausted");

    assert!(err.is_max_retries());
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "max retries reached: status code 503: Service Unavailable");
}

/// Test recovery after transient failures.
#[tokio::test]
async fn test_retry_recovers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let executor = Executor::builder(HyperTransport::new())
        .with_retry(quick_retry(3))
        .build();

    let response = executor.get(&url(&mock_server, "/flaky")).await.expect("response");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().expect("utf-8"), "recovered");
}

/// Test that status errors keep the response body.
#[tokio::test]
async fn test_error_on_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410).set_body_string("gone for good"))
        .mount(&mock_server)
        .await;

    let executor = Executor::builder(HyperTransport::new())
        .with_error_on_status([StatusCodeRange::CLIENT_ERRORS])
        .build();

    let err = executor.get(&url(&mock_server, "/gone")).await.expect_err("410");

    assert_eq!(err.status(), Some(410));
    let response = err.into_response().expect("response");
    assert_eq!(response.text().expect("utf-8"), "gone for good");
}

/// Test recording with a write-through cache, then replaying offline.
#[tokio::test]
async fn test_record_and_replay() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "abc123")
                .set_body_json(serde_json::json!({"id": 7})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let recorder = Executor::builder(HyperTransport::new())
        .with_write_through_cache(Arc::clone(&store), Duration::from_secs(60))
        .build();
    let live = recorder.get(&url(&mock_server, "/users/7")).await.expect("live");

    let replayer = Executor::builder(HyperTransport::new())
        .with_cache_only(Arc::clone(&store))
        .build();
    let replayed = replayer.get(&url(&mock_server, "/users/7")).await.expect("replayed");

    assert_eq!(replayed.status(), 200);
    assert_eq!(replayed.body(), live.body());
    assert_eq!(replayed.header("x-request-id"), Some("abc123"));

    let missing = replayer.get(&url(&mock_server, "/users/8")).await.expect("miss");
    assert_eq!(missing.status(), 404);
}

/// Test multiple middleware composed together.
#[tokio::test]
async fn test_middleware_composition() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/composed"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/composed"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"composed": true})),
        )
        .mount(&mock_server)
        .await;

    // logging -> retry -> status errors -> bearer auth -> transport
    let executor = Executor::builder(HyperTransport::new())
        .with_logging()
        .with_retry(quick_retry(2))
        .with_error_on_status([StatusCodeRange::SERVER_ERRORS])
        .layer(BearerAuthLayer::new("test-token"))
        .build();
    assert_eq!(executor.layer_count(), 4);

    let response = executor.get(&url(&mock_server, "/composed")).await.expect("response");

    assert!(response.is_success());
    let body: serde_json::Value = response.json().expect("json");
    assert_eq!(body["composed"], true);
}
