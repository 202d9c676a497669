//! Integration tests for `HyperTransport` using wiremock.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use spool::{
    CancellationToken, Executor, HttpClient, HttpClientExt, HyperTransport, Method, Request,
    TransportConfig,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn url(server: &MockServer, path: &str) -> url::Url {
    url::Url::parse(&format!("{}{path}", server.uri())).expect("url")
}

#[tokio::test]
async fn test_get_request() {
    let mock_server = MockServer::start().await;

    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::new();
    let request = Request::builder(Method::GET, url(&mock_server, "/users/1"))
        .header("Accept", "application/json")
        .build();

    let response = transport.execute(request).await.expect("response");

    assert!(response.is_success());
    assert_eq!(response.status(), 200);
    assert_eq!(response.status_text(), "OK");
    assert_eq!(response.url(), Some(&url(&mock_server, "/users/1")));

    let body: User = response.json().expect("json");
    assert_eq!(body, user);
}

#[tokio::test]
async fn test_post_json_through_executor() {
    let mock_server = MockServer::start().await;

    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    let output = User {
        id: 42,
        name: "Bob".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(&output))
        .mount(&mock_server)
        .await;

    let executor = Executor::new(HyperTransport::new());
    let response = executor
        .post_json(url(&mock_server, "/users").as_str(), &input)
        .await
        .expect("response");

    assert_eq!(response.status(), 201);
    let body: User = response.json().expect("json");
    assert_eq!(body, output);
}

#[tokio::test]
async fn test_http_error_status_is_a_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/not-found"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::new();
    let response = transport
        .get(url(&mock_server, "/not-found").as_str())
        .await
        .expect("response");

    assert!(response.is_client_error());
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().expect("utf-8"), "Not Found");
}

#[tokio::test]
async fn test_query_parameters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": ["spool", "rustls"]
        })))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::new();
    let request = Request::builder(Method::GET, url(&mock_server, "/search"))
        .query("q", "rust")
        .query("page", "1")
        .build();

    let response = transport.execute(request).await.expect("response");

    assert!(response.is_success());
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::with_config(
        TransportConfig::builder()
            .timeout(Duration::from_millis(100))
            .build(),
    );
    let request = Request::builder(Method::GET, url(&mock_server, "/slow")).build();

    let err = transport.execute(request).await.expect_err("expected timeout error");
    assert!(err.is_timeout(), "Expected timeout error, got: {err}");
}

#[tokio::test]
async fn test_unbounded_transport_waits_for_slow_responses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::with_config(TransportConfig::builder().no_timeout().build());
    let request = Request::builder(Method::GET, url(&mock_server, "/slow")).build();

    let response = transport.execute(request).await.expect("response");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_cancellation_abandons_the_round_trip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let transport = HyperTransport::new();
    let request = Request::builder(Method::GET, url(&mock_server, "/slow"))
        .cancellation(token)
        .build();

    let err = transport.execute(request).await.expect_err("expected cancellation");
    assert!(err.is_cancelled(), "Expected cancellation, got: {err}");
}

#[tokio::test]
async fn test_already_cancelled_context_never_sends() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let transport = HyperTransport::new();
    let request = Request::builder(Method::GET, url(&mock_server, "/"))
        .cancellation(token)
        .build();

    let err = transport.execute(request).await.expect_err("expected cancellation");
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_connection_error() {
    let transport = HyperTransport::new();

    let request = Request::builder(Method::GET, url::Url::parse("http://127.0.0.1:1").expect("url")).build();

    let err = transport.execute(request).await.expect_err("expected connection error");
    assert!(err.is_connection(), "Expected connection error, got: {err}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_response_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/with-headers"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "abc123")
                .insert_header("Content-Type", "application/json")
                .set_body_json(serde_json::json!({"ok": true})),
        )
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::new();
    let request = Request::builder(Method::GET, url(&mock_server, "/with-headers")).build();

    let response = transport.execute(request).await.expect("response");

    assert_eq!(response.header("x-request-id"), Some("abc123"));
    assert_eq!(response.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_delete_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::new();
    let request = Request::builder(Method::DELETE, url(&mock_server, "/users/1")).build();

    let response = transport.execute(request).await.expect("response");

    assert!(response.is_success());
    assert_eq!(response.status(), 204);
}
