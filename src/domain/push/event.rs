//! The immutable event record carried over push channels.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::EventKind;

/// Opaque key-value payload chosen by the producer.
///
/// No schema is enforced across kinds; any JSON object is accepted.
pub type EventPayload = serde_json::Map<String, serde_json::Value>;

/// One event as it appears on the wire: `{"kind", "payload", "timestamp"}`.
///
/// The timestamp is stamped when the event is published, never by the producer.
/// Events are not persisted; a channel that is not open at publish time never
/// sees the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub kind: EventKind,
    #[serde(default)]
    pub payload: EventPayload,
    pub timestamp: Timestamp,
}

impl PushEvent {
    /// Creates an event stamped with the current time.
    pub fn now(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            payload,
            timestamp: Timestamp::now(),
        }
    }

    /// Serializes the event to its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses an event from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a string field from the payload.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}
