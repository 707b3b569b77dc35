//! HTTP adapter for the push endpoints.
//!
//! - `GET /api/events` - Server-sent event stream for the caller
//! - `GET /api/events/status` - Who is connected right now
//! - `POST /api/events/publish` - Admin-only publish for external producers

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{health, EventsApiError, EventsAppState};
pub use routes::events_routes;
