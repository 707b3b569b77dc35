//! In-process transport between the registry and an open HTTP response.
//!
//! `MpscTransport` is the write side held by the registry; `ChannelStream`
//! is the read side handed to the response body. Dropping the stream (the
//! client went away) unregisters the connection it belongs to.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::foundation::{ConnectionId, UserId};
use crate::ports::{PushFrame, PushTransport, TransportError};

use super::ConnectionRegistry;

/// Bounded, non-blocking transport backed by a tokio mpsc channel.
#[derive(Debug)]
pub struct MpscTransport {
    sender: Mutex<Option<mpsc::Sender<PushFrame>>>,
}

impl MpscTransport {
    /// Creates a transport and the receiver its frames arrive on.
    ///
    /// `buffer` is clamped to at least one frame.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<PushFrame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (
            Self {
                sender: Mutex::new(Some(sender)),
            },
            receiver,
        )
    }
}

impl PushTransport for MpscTransport {
    fn write(&self, frame: PushFrame) -> Result<(), TransportError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(TransportError::Closed)?;
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn close(&self) {
        // Dropping the only sender ends the receiving stream.
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, |sender| sender.is_closed())
    }
}

/// Unregisters a connection when the response carrying it is dropped.
pub struct DisconnectGuard {
    registry: Arc<ConnectionRegistry>,
    identity: UserId,
    connection_id: ConnectionId,
}

impl DisconnectGuard {
    pub fn new(registry: Arc<ConnectionRegistry>, identity: UserId, connection_id: ConnectionId) -> Self {
        Self {
            registry,
            identity,
            connection_id,
        }
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self
            .registry
            .unregister_connection(&self.identity, self.connection_id)
        {
            tracing::debug!(
                user_id = %self.identity,
                connection_id = %self.connection_id,
                "Push client went away"
            );
        }
    }
}

/// Frames destined for one client, in the order they were accepted.
///
/// Ends when the transport is closed (superseded, shut down, or reaped).
pub struct ChannelStream {
    receiver: mpsc::Receiver<PushFrame>,
    connection_id: ConnectionId,
    _guard: DisconnectGuard,
}

impl ChannelStream {
    pub fn new(receiver: mpsc::Receiver<PushFrame>, guard: DisconnectGuard) -> Self {
        Self {
            receiver,
            connection_id: guard.connection_id,
            _guard: guard,
        }
    }

    /// Connection this stream belongs to.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl Stream for ChannelStream {
    type Item = PushFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserRole;
    use futures::StreamExt;

    #[tokio::test]
    async fn frames_arrive_in_write_order() {
        let (transport, mut receiver) = MpscTransport::channel(4);
        transport.write(PushFrame::event("1")).unwrap();
        transport.write(PushFrame::Heartbeat).unwrap();
        transport.write(PushFrame::event("2")).unwrap();

        assert_eq!(receiver.recv().await, Some(PushFrame::event("1")));
        assert_eq!(receiver.recv().await, Some(PushFrame::Heartbeat));
        assert_eq!(receiver.recv().await, Some(PushFrame::event("2")));
    }

    #[test]
    fn full_buffer_fails_without_blocking() {
        let (transport, _receiver) = MpscTransport::channel(1);
        transport.write(PushFrame::Heartbeat).unwrap();

        assert_eq!(transport.write(PushFrame::Heartbeat), Err(TransportError::Full));
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (transport, receiver) = MpscTransport::channel(1);
        drop(receiver);

        assert!(transport.is_closed());
        assert_eq!(transport.write(PushFrame::Heartbeat), Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn close_ends_the_receiving_side() {
        let (transport, mut receiver) = MpscTransport::channel(2);
        transport.write(PushFrame::Heartbeat).unwrap();
        transport.close();

        assert!(transport.is_closed());
        assert_eq!(transport.write(PushFrame::Heartbeat), Err(TransportError::Closed));
        assert_eq!(receiver.recv().await, Some(PushFrame::Heartbeat));
        assert_eq!(receiver.recv().await, None);
    }

    #[tokio::test]
    async fn dropping_stream_unregisters_its_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = UserId::new("u1").unwrap();
        let (transport, receiver) = MpscTransport::channel(4);
        let connection_id =
            registry.register(user.clone(), "Alice", UserRole::Admin, Arc::new(transport));

        let stream = ChannelStream::new(
            receiver,
            DisconnectGuard::new(registry.clone(), user.clone(), connection_id),
        );
        assert_eq!(registry.count(), 1);

        drop(stream);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn dropping_superseded_stream_keeps_replacement() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = UserId::new("u1").unwrap();

        let (old_transport, old_receiver) = MpscTransport::channel(4);
        let old_id = registry.register(user.clone(), "Alice", UserRole::Admin, Arc::new(old_transport));
        let mut old_stream = ChannelStream::new(
            old_receiver,
            DisconnectGuard::new(registry.clone(), user.clone(), old_id),
        );

        let (new_transport, _new_receiver) = MpscTransport::channel(4);
        let new_id = registry.register(user.clone(), "Alice", UserRole::Admin, Arc::new(new_transport));

        // Superseding closes the old transport, so the old stream ends.
        assert_eq!(old_stream.next().await, None);
        drop(old_stream);

        assert_eq!(registry.connection_of(&user), Some(new_id));
    }
}
