//! PublishEventHandler - Command handler for producer-side publishes.
//!
//! Validates what a producer hands over before it reaches the fan-out:
//! the kind must be a known, broadcastable kind and payload keys must be
//! non-empty.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::push::{EventKind, EventPayload};
use crate::ports::{EventPublisher, PublishReport};

/// Command to publish one event to every connected client.
#[derive(Debug, Clone)]
pub struct PublishEventCommand {
    /// Wire name of the kind, e.g. `ticket.created`.
    pub kind: String,
    pub payload: EventPayload,
}

/// Result type for the publish command.
pub type PublishEventResult = PublishReport;

/// Reasons a publish is refused before fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("Unknown event kind '{0}'")]
    UnknownKind(String),

    #[error("Event kind '{0}' cannot be broadcast")]
    NotBroadcastable(EventKind),

    #[error("Payload keys must not be empty")]
    EmptyPayloadKey,
}

/// Handler for validated publishes.
pub struct PublishEventHandler {
    publisher: Arc<dyn EventPublisher>,
}

impl PublishEventHandler {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub fn handle(&self, cmd: PublishEventCommand) -> Result<PublishEventResult, PublishError> {
        let kind: EventKind = cmd
            .kind
            .parse()
            .map_err(|_| PublishError::UnknownKind(cmd.kind.clone()))?;

        if !kind.is_broadcastable() {
            return Err(PublishError::NotBroadcastable(kind));
        }

        if cmd.payload.keys().any(|key| key.trim().is_empty()) {
            return Err(PublishError::EmptyPayloadKey);
        }

        Ok(self.publisher.publish(kind, cmd.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::push::{ConnectionRegistry, EventBroadcaster, RecordingTransport};
    use crate::domain::foundation::{UserId, UserRole};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> EventPayload {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (PublishEventHandler, Arc<RecordingTransport>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let transport = Arc::new(RecordingTransport::new());
        registry.register(
            UserId::new("u1").unwrap(),
            "Alice",
            UserRole::Admin,
            transport.clone(),
        );
        let handler = PublishEventHandler::new(EventBroadcaster::new_shared(registry));
        (handler, transport)
    }

    #[test]
    fn publishes_known_kind() {
        let (handler, transport) = setup();

        let report = handler
            .handle(PublishEventCommand {
                kind: "ticket.created".to_string(),
                payload: payload(json!({"ticket_id": "T-1"})),
            })
            .unwrap();

        assert_eq!(report.kind, EventKind::TicketCreated);
        assert_eq!(report.delivered, 1);
        assert_eq!(transport.events()[0].payload_str("ticket_id"), Some("T-1"));
    }

    #[test]
    fn rejects_unknown_kind() {
        let (handler, transport) = setup();

        let result = handler.handle(PublishEventCommand {
            kind: "ticket.deleted".to_string(),
            payload: EventPayload::new(),
        });

        assert_eq!(result, Err(PublishError::UnknownKind("ticket.deleted".to_string())));
        assert!(transport.frames().is_empty());
    }

    #[test]
    fn rejects_connected_kind() {
        let (handler, _) = setup();

        let result = handler.handle(PublishEventCommand {
            kind: "connected".to_string(),
            payload: EventPayload::new(),
        });

        assert_eq!(result, Err(PublishError::NotBroadcastable(EventKind::Connected)));
    }

    #[test]
    fn rejects_empty_payload_key() {
        let (handler, _) = setup();

        let result = handler.handle(PublishEventCommand {
            kind: "preview.registered".to_string(),
            payload: payload(json!({"": "x"})),
        });

        assert_eq!(result, Err(PublishError::EmptyPayloadKey));
    }
}
