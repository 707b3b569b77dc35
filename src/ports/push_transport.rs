//! PushTransport port - the write-only sink back to one client.
//!
//! The registry owns one transport per live channel. Writes never block: a
//! transport either accepts the frame into its bounded buffer or reports a
//! failure immediately, so one stalled client cannot hold up a fan-out.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised when writing to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The client side is gone or the transport was closed.
    #[error("Push transport closed")]
    Closed,

    /// The per-connection buffer is full; the client is not draining.
    #[error("Push transport buffer full")]
    Full,

    /// Any other write failure reported by the transport.
    #[error("Push transport write failed: {0}")]
    Write(String),
}

/// One server-to-client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// Keep-alive comment. Clients must ignore it.
    Heartbeat,

    /// A serialized event, shared by every recipient of one fan-out.
    Event(Arc<str>),
}

impl PushFrame {
    /// Comment text carried by heartbeat frames.
    pub const HEARTBEAT_COMMENT: &'static str = "heartbeat";

    /// Wraps an already-serialized event.
    pub fn event(json: impl Into<Arc<str>>) -> Self {
        PushFrame::Event(json.into())
    }
}

/// Write-only handle to one client's push connection.
pub trait PushTransport: Send + Sync {
    /// Hand a frame to the connection without waiting.
    fn write(&self, frame: PushFrame) -> Result<(), TransportError>;

    /// Close the connection. Best-effort and idempotent.
    fn close(&self);

    /// Returns true once the connection can no longer accept frames.
    fn is_closed(&self) -> bool;
}
