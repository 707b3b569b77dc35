//! HTTP adapters - REST and SSE endpoints.
//!
//! - `events` - Push stream, status and publish endpoints
//! - `middleware` - Credential extraction and validation
//! - `response` - `{success, data}` / `{success, error}` envelope

pub mod events;
pub mod middleware;
pub mod response;
pub mod router;

pub use events::{events_routes, EventsAppState};
pub use middleware::{AuthState, RequireAuth};
pub use response::{ApiError, ApiResponse};
pub use router::build_router;
