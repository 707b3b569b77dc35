//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session validation (JWT, mock)
//! - `http` - Axum routes for streaming, status and publishing
//! - `push` - Server-side channel registry, fan-out and lifecycle
//! - `push_client` - Reconnecting subscriber to the push stream

pub mod auth;
pub mod http;
pub mod push;
pub mod push_client;

pub use push::{ChannelLifecycle, ConnectionRegistry, EventBroadcaster};
pub use push_client::{HttpPushConnector, PushClient};
