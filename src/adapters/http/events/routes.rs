//! Axum router configuration for event endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{get_status, publish_event, stream_events, EventsAppState};

/// Create the event API router.
///
/// # Routes
///
/// ## Authenticated
/// - `GET /events` - Open the caller's push channel (SSE)
/// - `GET /events/status` - Connected agent snapshot
///
/// ## Admin
/// - `POST /events/publish` - Publish an event to every channel
pub fn events_routes() -> Router<EventsAppState> {
    Router::new()
        .route("/events", get(stream_events))
        .route("/events/status", get(get_status))
        .route("/events/publish", post(publish_event))
}
