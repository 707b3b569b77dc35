//! Integration tests for the push HTTP endpoints.
//!
//! These tests drive the full router (auth middleware, SSE stream, status and
//! publish endpoints) with a mock session validator:
//! 1. Health and authentication behavior
//! 2. The stream's headers, welcome frame and delivered broadcasts
//! 3. Status reflects open channels
//! 4. Publishing is admin-only and validates the kind

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use void_relay::adapters::auth::MockSessionValidator;
use void_relay::adapters::http::{build_router, AuthState, EventsAppState};
use void_relay::adapters::push::{
    ChannelLifecycle, ConnectionRegistry, EventBroadcaster, RecordingTransport,
};
use void_relay::domain::foundation::{UserId, UserRole};
use void_relay::domain::push::{EventKind, PushEvent};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    registry: Arc<ConnectionRegistry>,
}

fn test_app() -> TestApp {
    let registry = Arc::new(ConnectionRegistry::new());
    let broadcaster = EventBroadcaster::new_shared(registry.clone());
    let lifecycle = ChannelLifecycle::new(
        registry.clone(),
        broadcaster.clone(),
        std::time::Duration::from_secs(30),
        16,
    );

    let validator = MockSessionValidator::new()
        .with_test_user("admin-token", "admin-1", UserRole::Admin)
        .with_test_user("agent-token", "agent-1", UserRole::FixAgent);

    let state = EventsAppState {
        lifecycle,
        publisher: broadcaster,
        connections: registry.clone(),
    };

    TestApp {
        router: build_router(state, AuthState::new(Arc::new(validator)), &[]),
        registry,
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn publish(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/events/publish")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Reads the next `data:` frame off an SSE body and parses its event.
async fn next_event<S>(body: &mut S) -> PushEvent
where
    S: futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
{
    let chunk = body.next().await.unwrap().unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    PushEvent::from_json(data).unwrap()
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn health_is_public() {
    let app = test_app();

    let response = app.router.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn status_requires_credential() {
    let app = test_app();

    let response = app
        .router
        .oneshot(get("/api/events/status", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn invalid_credential_is_rejected() {
    let app = test_app();

    let response = app
        .router
        .oneshot(get("/api/events", Some("forged")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.registry.count(), 0);
}

#[tokio::test]
async fn credential_is_accepted_from_query() {
    let app = test_app();

    let response = app
        .router
        .oneshot(get("/api/events/status?token=agent-token", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Stream and status
// =============================================================================

#[tokio::test]
async fn stream_starts_with_connected_welcome() {
    let app = test_app();

    let response = app
        .router
        .oneshot(get("/api/events", Some("agent-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let mut body = response.into_body().into_data_stream();
    let welcome = next_event(&mut body).await;

    assert_eq!(welcome.kind, EventKind::Connected);
    assert_eq!(welcome.payload_str("user_id"), Some("agent-1"));
    assert_eq!(app.registry.count(), 1);
}

#[tokio::test]
async fn dropping_stream_unregisters_channel() {
    let app = test_app();

    let response = app
        .router
        .oneshot(get("/api/events", Some("agent-token")))
        .await
        .unwrap();
    assert_eq!(app.registry.count(), 1);

    drop(response);
    assert_eq!(app.registry.count(), 0);
}

#[tokio::test]
async fn status_lists_connected_agents() {
    let app = test_app();
    app.registry.register(
        UserId::new("agent-1").unwrap(),
        "Agent One",
        UserRole::FixAgent,
        Arc::new(RecordingTransport::new()),
    );

    let response = app
        .router
        .oneshot(get("/api/events/status", Some("admin-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["active_connections"], 1);
    assert_eq!(body["data"]["connected_agents"][0]["username"], "Agent One");
    assert_eq!(body["data"]["connected_agents"][0]["role"], "fix_agent");
}

// =============================================================================
// Publishing
// =============================================================================

#[tokio::test]
async fn publish_requires_admin() {
    let app = test_app();

    let response = app
        .router
        .oneshot(publish(
            "agent-token",
            json!({ "kind": "ticket.created", "payload": { "ticket_id": "T-1" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn publish_refuses_connected_kind() {
    let app = test_app();

    let response = app
        .router
        .oneshot(publish("admin-token", json!({ "kind": "connected" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn publish_refuses_unknown_kind() {
    let app = test_app();

    let response = app
        .router
        .oneshot(publish("admin-token", json!({ "kind": "ticket.exploded" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn publish_rejects_malformed_body() {
    let app = test_app();

    let response = app
        .router
        .oneshot(publish("admin-token", json!({ "payload": {} })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn publish_delivers_to_every_channel() {
    let app = test_app();
    let transport = Arc::new(RecordingTransport::new());
    app.registry.register(
        UserId::new("agent-2").unwrap(),
        "Agent Two",
        UserRole::VoiceAgent,
        transport.clone(),
    );

    let response = app
        .router
        .oneshot(publish(
            "admin-token",
            json!({ "kind": "ticket.approved", "payload": { "ticket_id": "T-9" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["kind"], "ticket.approved");
    assert_eq!(body["data"]["delivered"], 1);

    let events = transport.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::TicketApproved);
    assert_eq!(events[0].payload_str("ticket_id"), Some("T-9"));
}

#[tokio::test]
async fn published_event_reaches_open_stream() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/events", Some("agent-token")))
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    assert_eq!(next_event(&mut body).await.kind, EventKind::Connected);

    let published = app
        .router
        .oneshot(publish(
            "admin-token",
            json!({ "kind": "ticket.claimed", "payload": { "ticket_id": "T-3" } }),
        ))
        .await
        .unwrap();
    assert_eq!(published.status(), StatusCode::OK);

    let event = next_event(&mut body).await;
    assert_eq!(event.kind, EventKind::TicketClaimed);
    assert_eq!(event.payload_str("ticket_id"), Some("T-3"));
}
