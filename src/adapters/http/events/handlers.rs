//! HTTP handlers for the event endpoints.
//!
//! These handlers connect Axum routes to the push lifecycle and the
//! application layer query/command handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    Json,
};
use futures::{Stream, StreamExt};
use http::header::{HeaderName, CACHE_CONTROL};

use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::response::{ApiError, ApiResponse};
use crate::adapters::push::ChannelLifecycle;
use crate::application::handlers::{
    GetConnectionStatusHandler, GetConnectionStatusQuery, PublishError, PublishEventCommand,
    PublishEventHandler,
};
use crate::domain::foundation::{Timestamp, UserRole};
use crate::ports::{ConnectionReader, EventPublisher, PushFrame};

use super::dto::{HealthResponse, PublishEventRequest, PublishEventResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the event endpoints.
#[derive(Clone)]
pub struct EventsAppState {
    pub lifecycle: ChannelLifecycle,
    pub publisher: Arc<dyn EventPublisher>,
    pub connections: Arc<dyn ConnectionReader>,
}

impl EventsAppState {
    pub fn status_handler(&self) -> GetConnectionStatusHandler {
        GetConnectionStatusHandler::new(self.connections.clone())
    }

    pub fn publish_handler(&self) -> PublishEventHandler {
        PublishEventHandler::new(self.publisher.clone())
    }
}

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /api/events` - open the caller's push channel.
///
/// The first frame is the `connected` welcome; afterwards every broadcast
/// plus a heartbeat comment per interval. The response ends when the channel
/// is superseded or reaped; a client disconnect unregisters it.
pub async fn stream_events(
    State(state): State<EventsAppState>,
    RequireAuth(user): RequireAuth,
) -> impl IntoResponse {
    let stream = state.lifecycle.open(&user);

    (
        [(CACHE_CONTROL, "no-cache"), (X_ACCEL_BUFFERING, "no")],
        Sse::new(sse_events(stream)),
    )
}

fn sse_events(
    frames: impl Stream<Item = PushFrame> + Send + 'static,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    frames.map(|frame| Ok(to_sse_event(frame)))
}

fn to_sse_event(frame: PushFrame) -> Event {
    match frame {
        PushFrame::Heartbeat => Event::default().comment(PushFrame::HEARTBEAT_COMMENT),
        PushFrame::Event(json) => Event::default().data(&*json),
    }
}

/// `GET /api/events/status` - who is connected right now.
pub async fn get_status(
    State(state): State<EventsAppState>,
    RequireAuth(_user): RequireAuth,
) -> impl IntoResponse {
    let snapshot = state.status_handler().handle(GetConnectionStatusQuery);
    ApiResponse::ok(snapshot)
}

/// `POST /api/events/publish` - admin-only ingestion for out-of-process producers.
pub async fn publish_event(
    State(state): State<EventsAppState>,
    auth: RequireAuth,
    body: Result<Json<PublishEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, EventsApiError> {
    auth.require_any_role(&[UserRole::Admin])
        .map_err(EventsApiError::Auth)?;

    let Json(request) = body.map_err(|e| EventsApiError::Body(e.body_text()))?;

    let report = state.publish_handler().handle(PublishEventCommand {
        kind: request.kind,
        payload: request.payload,
    })?;

    tracing::info!(
        kind = %report.kind,
        published_by = %auth.0.id,
        delivered = report.delivered,
        failed = report.failed.len(),
        "Event published via API"
    );

    Ok(ApiResponse::ok(PublishEventResponse::from(report)))
}

/// `GET /health` - liveness probe.
pub async fn health() -> impl IntoResponse {
    ApiResponse::ok(HealthResponse {
        status: "healthy",
        timestamp: Timestamp::now().to_iso_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Errors returned by the event endpoints.
#[derive(Debug)]
pub enum EventsApiError {
    Auth(crate::adapters::http::middleware::AuthRejection),
    Body(String),
    Publish(PublishError),
}

impl From<PublishError> for EventsApiError {
    fn from(err: PublishError) -> Self {
        Self::Publish(err)
    }
}

impl IntoResponse for EventsApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            EventsApiError::Auth(rejection) => rejection.into_response(),
            EventsApiError::Body(message) => ApiError::bad_request(message).into_response(),
            EventsApiError::Publish(err) => ApiError::bad_request(err.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::push::EventKind;

    #[test]
    fn publish_errors_map_to_bad_request() {
        let response =
            EventsApiError::from(PublishError::NotBroadcastable(EventKind::Connected)).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn events_app_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<EventsAppState>();
    }
}
