//! Event broadcaster: fans one event out to every live channel.
//!
//! # Delivery
//!
//! ```text
//! publish(kind, payload)
//!     │  stamp timestamp, serialize once
//!     ▼
//! registry.recipients()        (copied, lock released)
//!     │
//!     ├─▶ transport A.write ── ok
//!     ├─▶ transport B.write ── err ──▶ unregister B
//!     └─▶ transport C.write ── ok
//! ```
//!
//! Writes never block, so a stalled client cannot delay the others. A
//! failed write removes that one channel; the remaining recipients are
//! always attempted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::foundation::{AuthenticatedUser, ConnectionId, Timestamp, UserId};
use crate::domain::push::{EventKind, EventPayload, PushEvent};
use crate::ports::{EventPublisher, PublishReport, PushFrame, PushTransport, TransportError};

use super::ConnectionRegistry;

/// Result of handing one frame to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub identity: UserId,
    pub connection_id: ConnectionId,
    pub result: Result<(), TransportError>,
}

/// Fans events out to every channel in the registry.
pub struct EventBroadcaster {
    registry: Arc<ConnectionRegistry>,
    // Serializes fan-outs and direct sends so every channel sees them in the same order.
    publish_order: Mutex<()>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            publish_order: Mutex::new(()),
        }
    }

    /// Create as an Arc (for sharing between handlers).
    pub fn new_shared(registry: Arc<ConnectionRegistry>) -> Arc<Self> {
        Arc::new(Self::new(registry))
    }

    /// Registry this broadcaster delivers through.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Stamp, serialize, and fan out one event.
    ///
    /// The synthetic `connected` kind is refused here; it is only ever sent
    /// to the channel that just opened via [`send_to_one`](Self::send_to_one).
    pub fn broadcast(&self, kind: EventKind, payload: EventPayload) -> PublishReport {
        let event = PushEvent::now(kind, payload);

        if !kind.is_broadcastable() {
            tracing::warn!(kind = %kind, "Refusing to broadcast per-connection event kind");
            return PublishReport::empty(kind, event.timestamp);
        }

        let Some(frame) = encode(&event) else {
            return PublishReport::empty(kind, event.timestamp);
        };

        let deliveries = self.fan_out(frame);
        let report = self.settle(kind, event.timestamp, deliveries);

        tracing::debug!(
            kind = %kind,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Event broadcast"
        );

        report
    }

    /// Register a channel and hand it the `connected` welcome before any
    /// broadcast can reach it.
    pub fn admit(
        &self,
        user: &AuthenticatedUser,
        transport: Arc<dyn PushTransport>,
        welcome: EventPayload,
    ) -> ConnectionId {
        let _ordered = self.ordered();
        let connection_id =
            self.registry
                .register(user.id.clone(), user.username.clone(), user.role, transport);
        self.deliver_to_one(&user.id, EventKind::Connected, welcome);
        connection_id
    }

    /// Write one event to a single user's channel.
    ///
    /// Returns `false` (and unregisters the channel on a failed write) if
    /// the event could not be handed over.
    pub fn send_to_one(&self, identity: &UserId, kind: EventKind, payload: EventPayload) -> bool {
        let _ordered = self.ordered();
        self.deliver_to_one(identity, kind, payload)
    }

    fn ordered(&self) -> MutexGuard<'_, ()> {
        self.publish_order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver_to_one(&self, identity: &UserId, kind: EventKind, payload: EventPayload) -> bool {
        let Some(recipient) = self.registry.recipient(identity) else {
            tracing::debug!(user_id = %identity, kind = %kind, "No channel for direct send");
            return false;
        };

        let event = PushEvent::now(kind, payload);
        let Some(frame) = encode(&event) else {
            return false;
        };

        match recipient.transport.write(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    user_id = %identity,
                    connection_id = %recipient.connection_id,
                    kind = %kind,
                    error = %e,
                    "Direct send failed, dropping channel"
                );
                self.registry
                    .unregister_connection(identity, recipient.connection_id);
                false
            }
        }
    }

    /// Hand `frame` to every current recipient.
    ///
    /// The registry lock is not held while writing.
    fn fan_out(&self, frame: PushFrame) -> Vec<Delivery> {
        let _ordered = self.ordered();

        self.registry
            .recipients()
            .into_iter()
            .map(|recipient| Delivery {
                result: recipient.transport.write(frame.clone()),
                identity: recipient.identity,
                connection_id: recipient.connection_id,
            })
            .collect()
    }

    /// Fold deliveries into a report, unregistering every failed channel.
    fn settle(&self, kind: EventKind, timestamp: Timestamp, deliveries: Vec<Delivery>) -> PublishReport {
        let mut report = PublishReport::empty(kind, timestamp);

        for delivery in deliveries {
            match delivery.result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id = %delivery.identity,
                        connection_id = %delivery.connection_id,
                        kind = %kind,
                        error = %e,
                        "Push write failed, dropping channel"
                    );
                    self.registry
                        .unregister_connection(&delivery.identity, delivery.connection_id);
                    report.failed.push(delivery.identity);
                }
            }
        }

        report
    }
}

impl EventPublisher for EventBroadcaster {
    fn publish(&self, kind: EventKind, payload: EventPayload) -> PublishReport {
        self.broadcast(kind, payload)
    }
}

fn encode(event: &PushEvent) -> Option<PushFrame> {
    match event.to_json() {
        Ok(json) => Some(PushFrame::event(json)),
        Err(e) => {
            tracing::error!(kind = %event.kind, error = %e, "Failed to serialize push event");
            None
        }
    }
}
