//! Chat Relay Contract Tests
//!
//! These tests pin the relay's HTTP behavior end to end: upstream request
//! format, strict key fallback order, success passthrough, the canonical
//! error bodies callers see when every key fails, and how the relay client
//! maps those responses onto the error taxonomy.

use std::time::Duration;

use pooja::chat::RelayClient;
use pooja::config::RelayConfig;
use pooja::credentials::StoredKeys;
use pooja::error::AssistError;
use pooja::relay::{ChatMessage, RelayServer};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "deepseek/deepseek-r1:free";
const UPSTREAM_PATH: &str = "/api/v1/chat/completions";

/// Upstream-shaped completion payload with the given assistant text.
fn completion_payload(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-abc123",
        "model": MODEL,
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 34}
    })
}

async fn start_relay(upstream: &MockServer, server_keys: Vec<String>) -> RelayServer {
    let config = RelayConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        upstream_url: format!("{}{UPSTREAM_PATH}", upstream.uri()),
        request_timeout_secs: 5,
    };
    RelayServer::start(&config, 0.7, server_keys)
        .await
        .expect("relay server should start")
}

fn chat_url(server: &RelayServer) -> String {
    format!("http://{}/chat", server.addr())
}

/// Authorization header values of every upstream request, in arrival order.
async fn bearer_headers(upstream: &MockServer) -> Vec<String> {
    upstream
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_owned()
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Upstream request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_forwards_bearer_key_title_header_and_body() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "P.O.O.J.A Mental Health Assistant"))
        .and(body_partial_json(json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "I feel anxious"}],
            "temperature": 0.7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("I'm here.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "I feel anxious"}],
            "customApiKey": "sk-test"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_success_passes_upstream_payload_through_verbatim() {
    let upstream = MockServer::start().await;
    let payload = completion_payload("You are not alone in this.");

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let body: serde_json::Value = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-test"
        }))
        .send()
        .await
        .expect("relay reachable")
        .json()
        .await
        .expect("relay returns JSON");

    assert_eq!(body, payload, "relay must not rewrite the success payload");
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback order
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tries_keys_in_order_until_one_succeeds() {
    let upstream = MockServer::start().await;

    for rejected in ["sk-one", "sk-two"] {
        Mock::given(method("POST"))
            .and(path(UPSTREAM_PATH))
            .and(header("authorization", format!("Bearer {rejected}")))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&upstream)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-three"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("Hello.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one",
            "backupApiKey1": "sk-two",
            "backupApiKey2": "sk-three"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 200);
    assert_eq!(
        bearer_headers(&upstream).await,
        vec!["Bearer sk-one", "Bearer sk-two", "Bearer sk-three"]
    );
}

#[tokio::test]
async fn test_first_success_stops_the_fallback_chain() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("Hi.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one",
            "backupApiKey1": "sk-never",
            "backupApiKey2": "sk-never-either"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 200);
    assert_eq!(bearer_headers(&upstream).await, vec!["Bearer sk-one"]);
}

#[tokio::test]
async fn test_caller_keys_are_tried_before_server_keys() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-caller"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("Hello.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, vec!["sk-server".to_owned()]).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-caller"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 200);
    assert_eq!(
        bearer_headers(&upstream).await,
        vec!["Bearer sk-caller", "Bearer sk-server"]
    );
}

#[tokio::test]
async fn test_blank_caller_keys_are_skipped() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("Hi.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "",
            "backupApiKey1": "sk-real"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 200);
    assert_eq!(bearer_headers(&upstream).await, vec!["Bearer sk-real"]);
}

#[tokio::test]
async fn test_empty_completion_counts_as_failure_and_falls_back() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("")))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_payload("Here.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let body: serde_json::Value = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-empty",
            "backupApiKey1": "sk-full"
        }))
        .send()
        .await
        .expect("relay reachable")
        .json()
        .await
        .expect("relay returns JSON");

    assert_eq!(body["choices"][0]["message"]["content"], "Here.");
}

// ────────────────────────────────────────────────────────────────────────────
// Canonical error bodies
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_no_keys_is_401_without_touching_upstream() {
    let upstream = MockServer::start().await;
    let relay = start_relay(&upstream, Vec::new()).await;

    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.expect("error body is JSON");
    assert_eq!(
        body["error"],
        "No API keys configured. Please add an API key in settings or configure server environment variables."
    );
    assert!(bearer_headers(&upstream).await.is_empty());
}

#[tokio::test]
async fn test_all_keys_rejected_is_401_with_auth_failed_body() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one",
            "backupApiKey1": "sk-two"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.expect("error body is JSON");
    assert_eq!(
        body["error"],
        "Authentication failed: All API keys are invalid. Please provide a valid API key."
    );
}

#[tokio::test]
async fn test_all_keys_throttled_is_429_with_rate_limited_body() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one",
            "backupApiKey1": "sk-two"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 429);
    let body: serde_json::Value = response.json().await.expect("error body is JSON");
    assert_eq!(
        body["error"],
        "Rate limit exceeded: All available API keys are rate limited. Please try again later."
    );
}

#[tokio::test]
async fn test_other_upstream_status_is_500_with_status_text() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("error body is JSON");
    assert_eq!(body["error"], "API request failed with status 503");
}

#[tokio::test]
async fn test_last_failure_status_decides_the_error_class() {
    let upstream = MockServer::start().await;

    // First key hits a server error, the last key is throttled. The 429
    // from the final attempt wins the classification.
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-one"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer sk-two"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one",
            "backupApiKey1": "sk-two"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn test_unreachable_upstream_reports_assumed_status_500() {
    // Nothing listens on the upstream port, so no attempt ever records an
    // HTTP status and the resolver falls back to its assumed 500.
    let config = RelayConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        upstream_url: "http://127.0.0.1:9/api/v1/chat/completions".to_owned(),
        request_timeout_secs: 2,
    };
    let relay = RelayServer::start(&config, 0.7, Vec::new())
        .await
        .expect("relay server should start");

    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-one"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("error body is JSON");
    assert_eq!(body["error"], "API request failed with status 500");
}

#[tokio::test]
async fn test_error_bodies_never_leak_key_values() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key sk-caller-secret"))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let response = reqwest::Client::new()
        .post(chat_url(&relay))
        .json(&json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "customApiKey": "sk-caller-secret"
        }))
        .send()
        .await
        .expect("relay reachable");

    assert_eq!(response.status(), 401);
    let text = response.text().await.expect("error body readable");
    assert!(
        !text.contains("sk-caller-secret"),
        "relay error bodies must not echo credentials: {text}"
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Client-side error mapping
// ────────────────────────────────────────────────────────────────────────────

/// Client pointed at the relay with one saved key attached.
fn keyed_client(relay: &RelayServer) -> RelayClient {
    let mut client =
        RelayClient::new(chat_url(relay), Duration::from_secs(5)).expect("client should build");
    client.set_keys(&StoredKeys {
        primary: Some("sk-test".to_owned()),
        ..StoredKeys::default()
    });
    client
}

fn user_message(content: &str) -> Vec<ChatMessage> {
    vec![ChatMessage {
        role: "user".to_owned(),
        content: content.to_owned(),
    }]
}

#[tokio::test]
async fn test_client_surfaces_401_as_unauthorized() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let result = keyed_client(&relay).complete(MODEL, user_message("hi")).await;

    match result {
        Err(AssistError::Unauthorized(detail)) => assert_eq!(
            detail,
            "Authentication failed: All API keys are invalid. Please provide a valid API key."
        ),
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_surfaces_429_as_rate_limited() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let result = keyed_client(&relay).complete(MODEL, user_message("hi")).await;

    match result {
        Err(AssistError::RateLimited(detail)) => assert_eq!(
            detail,
            "Rate limit exceeded: All available API keys are rate limited. Please try again later."
        ),
        other => panic!("expected rate limited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_surfaces_other_failures_as_transport() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, Vec::new()).await;
    let result = keyed_client(&relay).complete(MODEL, user_message("hi")).await;

    match result {
        Err(AssistError::Transport(detail)) => {
            assert_eq!(detail, "API request failed with status 503");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_treats_contentless_success_as_transport_failure() {
    // A relay (or whatever sits at its URL) answering 200 without a
    // completion is a failed attempt so the caller's model fallback runs.
    let fake_relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-abc123",
            "choices": []
        })))
        .expect(1)
        .mount(&fake_relay)
        .await;

    let client = RelayClient::new(format!("{}/chat", fake_relay.uri()), Duration::from_secs(5))
        .expect("client should build");
    let result = client.complete(MODEL, user_message("hi")).await;

    match result {
        Err(AssistError::Transport(detail)) => {
            assert_eq!(detail, "completion payload had no content");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}
