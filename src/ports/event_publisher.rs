//! EventPublisher port - Interface for publishing push events.
//!
//! Ticket and preview handlers depend on this port, not on the broadcaster
//! directly. They call it synchronously after each state change commits.

use serde::Serialize;

use crate::domain::foundation::{UserId, Timestamp};
use crate::domain::push::{EventKind, EventPayload};
use crate::domain::ticket::TicketEvent;

/// Outcome of one fan-out.
///
/// Delivery is fire-and-forget: a channel that failed has already been pruned
/// by the time the report is returned, and the caller is never expected to
/// retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Event kind that was published.
    pub kind: EventKind,
    /// Time stamped on the event.
    pub timestamp: Timestamp,
    /// Channels the frame was handed to.
    pub delivered: usize,
    /// Identities whose write failed and were unregistered.
    pub failed: Vec<UserId>,
}

impl PublishReport {
    /// Report for a publish that reached no channel at all.
    pub fn empty(kind: EventKind, timestamp: Timestamp) -> Self {
        Self {
            kind,
            timestamp,
            delivered: 0,
            failed: Vec::new(),
        }
    }

    /// Number of channels the publish was attempted on.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// Port for publishing push events to every connected client.
///
/// Implementations must ensure:
/// - The timestamp is stamped at publish time
/// - One failing recipient never prevents delivery to the others
/// - Publishing to zero recipients is a clean no-op
/// - Publishes are not deduplicated
///
/// # Example
///
/// ```ignore
/// publisher.publish(EventKind::TicketCreated, payload);
/// ```
pub trait EventPublisher: Send + Sync {
    /// Fan out one event to every registered channel.
    fn publish(&self, kind: EventKind, payload: EventPayload) -> PublishReport;

    /// Publish a typed ticket or preview change.
    fn publish_ticket_event(&self, event: &TicketEvent) -> PublishReport {
        self.publish(event.kind(), event.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn EventPublisher) {}

    struct RecordingPublisher {
        published: Mutex<Vec<(EventKind, EventPayload)>>,
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, kind: EventKind, payload: EventPayload) -> PublishReport {
            self.published.lock().unwrap().push((kind, payload));
            PublishReport::empty(kind, Timestamp::now())
        }
    }

    #[test]
    fn publish_ticket_event_maps_kind_and_payload() {
        let publisher = RecordingPublisher {
            published: Mutex::new(Vec::new()),
        };

        publisher.publish_ticket_event(&TicketEvent::Claimed {
            ticket_id: "T-9".into(),
            claimed_by: "Bob".into(),
        });

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, EventKind::TicketClaimed);
        assert_eq!(published[0].1["claimed_by"], "Bob");
    }

    #[test]
    fn attempted_counts_both_outcomes() {
        let report = PublishReport {
            kind: EventKind::TicketApproved,
            timestamp: Timestamp::now(),
            delivered: 2,
            failed: vec![UserId::new("u3").unwrap()],
        };
        assert_eq!(report.attempted(), 3);
    }
}
