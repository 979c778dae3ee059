use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use claude_relay_common::RelayConfig;
use claude_relay_core::Core;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::net::TcpListener;
use tower::ServiceExt;

#[derive(Debug, Clone)]
struct SeenRequest {
    api_key: Option<String>,
    version: Option<String>,
    body: Value,
}

type Seen = Arc<Mutex<Vec<SeenRequest>>>;

async fn spawn_upstream(status: StatusCode, reply: Value) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let app = Router::new().route(
        "/v1/messages",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let recorder = recorder.clone();
            let reply = reply.clone();
            async move {
                recorder.lock().unwrap().push(SeenRequest {
                    api_key: header(&headers, "x-api-key"),
                    version: header(&headers, "anthropic-version"),
                    body,
                });
                (status, [("request-id", "req_test")], Json(reply)).into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

/// Address with nothing listening on it.
async fn closed_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn relay_app(base_url: &str, api_key: Option<&str>) -> Router {
    let config = RelayConfig {
        api_key: api_key.map(str::to_string),
        upstream_base_url: base_url.to_string(),
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
        ..Default::default()
    };
    Core::from_config(config).unwrap().router()
}

fn analyze(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_without_credential() {
    let app = relay_app("http://127.0.0.1:9", None);
    let before = OffsetDateTime::now_utc();

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["status"], "ok");
    let timestamp = OffsetDateTime::parse(body["timestamp"].as_str().unwrap(), &Rfc3339).unwrap();
    assert!(timestamp >= before - time::Duration::seconds(1));
    assert!(timestamp <= OffsetDateTime::now_utc() + time::Duration::seconds(1));
}

#[tokio::test]
async fn success_is_passed_through_with_injected_defaults() {
    let reply = json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "analysis"}],
        "stop_reason": "end_turn"
    });
    let (base_url, seen) = spawn_upstream(StatusCode::OK, reply.clone()).await;
    let app = relay_app(&base_url, Some("sk-relay"));

    let resp = app
        .oneshot(analyze(
            r#"{"messages":[{"role":"user","content":"analyze this"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-relay-request-id"));
    assert_eq!(read_json(resp).await, reply);

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].api_key.as_deref(), Some("sk-relay"));
    assert_eq!(seen[0].version.as_deref(), Some("2023-06-01"));
    assert_eq!(
        seen[0].body,
        json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 4000,
            "messages": [{"role": "user", "content": "analyze this"}]
        })
    );
}

#[tokio::test]
async fn upstream_error_status_and_body_are_propagated() {
    let (base_url, _seen) = spawn_upstream(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "rate limited"}}),
    )
    .await;
    let app = relay_app(&base_url, Some("sk-relay"));

    let resp = app
        .oneshot(analyze(r#"{"messages":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        read_json(resp).await,
        json!({"error": "rate limited", "details": {"error": {"message": "rate limited"}}})
    );
}

#[tokio::test]
async fn missing_credential_never_reaches_upstream() {
    let (base_url, seen) = spawn_upstream(StatusCode::OK, json!({})).await;
    let app = relay_app(&base_url, None);

    let resp = app
        .oneshot(analyze(r#"{"messages":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(resp).await,
        json!({"error": "CLAUDE_API_KEY not configured"})
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrongly_typed_fields_still_hit_the_credential_check() {
    let (base_url, seen) = spawn_upstream(StatusCode::OK, json!({})).await;
    let app = relay_app(&base_url, None);

    let resp = app
        .oneshot(analyze(r#"{"model":5,"max_tokens":"4000","messages":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(resp).await,
        json!({"error": "CLAUDE_API_KEY not configured"})
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrongly_typed_fields_are_forwarded_verbatim() {
    let (base_url, seen) = spawn_upstream(StatusCode::OK, json!({"ok": true})).await;
    let app = relay_app(&base_url, Some("sk-relay"));

    let resp = app
        .oneshot(analyze(r#"{"model":5,"max_tokens":"4000","messages":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen[0].body,
        json!({"model": 5, "max_tokens": "4000", "messages": []})
    );
}

#[tokio::test]
async fn unreachable_upstream_maps_to_proxy_server_error() {
    let base_url = closed_addr().await;
    let app = relay_app(&base_url, Some("sk-relay"));

    let resp = app
        .oneshot(analyze(r#"{"messages":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "Proxy server error");
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn malformed_body_is_rejected_locally() {
    let (base_url, seen) = spawn_upstream(StatusCode::OK, json!({})).await;
    let app = relay_app(&base_url, Some("sk-relay"));

    let resp = app.oneshot(analyze("{not json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["error"], "Invalid request body");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (base_url, seen) = spawn_upstream(StatusCode::OK, json!({})).await;
    let config = RelayConfig {
        api_key: Some("sk-relay".to_string()),
        upstream_base_url: base_url,
        max_body_bytes: 64,
        ..Default::default()
    };
    let app = Core::from_config(config).unwrap().router();

    let big = format!(
        r#"{{"messages":[{{"role":"user","content":"{}"}}]}}"#,
        "x".repeat(256)
    );
    let resp = app.oneshot(analyze(big)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn any_origin_is_allowed() {
    let app = relay_app("http://127.0.0.1:9", None);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "https://dashboard.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}
