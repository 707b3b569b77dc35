//! Server-sent event fan-out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │   Ticket / preview handlers  ──▶  EventPublisher (port)       │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      EventBroadcaster                         │
//! │   - Stamps and serializes each event once                     │
//! │   - Writes to every channel without blocking                  │
//! │   - Drops channels whose write failed                         │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ConnectionRegistry                        │
//! │   u1 ──▶ channel c7      u2 ──▶ channel c9      u3 ──▶ ...    │
//! └──────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ open / close
//! ┌──────────────────────────────────────────────────────────────┐
//! │   ChannelLifecycle: welcome, heartbeat, disconnect cleanup    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`registry`] - One live channel per user
//! - [`broadcaster`] - Fan-out and direct sends
//! - [`lifecycle`] - Opening channels and keeping them alive
//! - [`transport`] - Bounded in-process transport and response stream
//! - [`mock`] - Recording transport for tests

pub mod broadcaster;
pub mod lifecycle;
pub mod mock;
pub mod registry;
pub mod transport;

pub use broadcaster::{Delivery, EventBroadcaster};
pub use lifecycle::{spawn_heartbeat, ChannelLifecycle};
pub use mock::RecordingTransport;
pub use registry::{ConnectionRegistry, Recipient};
pub use transport::{ChannelStream, DisconnectGuard, MpscTransport};
