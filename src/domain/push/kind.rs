//! Event kinds carried over push channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Every kind of event a push channel can carry.
///
/// All kinds except [`EventKind::Connected`] are domain events fanned out to
/// every channel. `Connected` is the synthetic per-connection welcome and is
/// only ever sent to the channel that just opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "ticket.created")]
    TicketCreated,
    #[serde(rename = "ticket.claimed")]
    TicketClaimed,
    #[serde(rename = "ticket.submitted_fix")]
    TicketSubmittedFix,
    #[serde(rename = "ticket.approved")]
    TicketApproved,
    #[serde(rename = "ticket.rejected")]
    TicketRejected,
    #[serde(rename = "preview.registered")]
    PreviewRegistered,
    #[serde(rename = "connected")]
    Connected,
}

impl EventKind {
    /// Kinds that may be passed to a broadcast.
    pub const BROADCASTABLE: &'static [EventKind] = &[
        EventKind::TicketCreated,
        EventKind::TicketClaimed,
        EventKind::TicketSubmittedFix,
        EventKind::TicketApproved,
        EventKind::TicketRejected,
        EventKind::PreviewRegistered,
    ];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TicketCreated => "ticket.created",
            EventKind::TicketClaimed => "ticket.claimed",
            EventKind::TicketSubmittedFix => "ticket.submitted_fix",
            EventKind::TicketApproved => "ticket.approved",
            EventKind::TicketRejected => "ticket.rejected",
            EventKind::PreviewRegistered => "preview.registered",
            EventKind::Connected => "connected",
        }
    }

    /// False only for the synthetic `connected` welcome.
    pub fn is_broadcastable(&self) -> bool {
        !matches!(self, EventKind::Connected)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::BROADCASTABLE
            .iter()
            .chain(std::iter::once(&EventKind::Connected))
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| ValidationError::unrecognized("event kind", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_wire_names() {
        for kind in EventKind::BROADCASTABLE
            .iter()
            .chain(std::iter::once(&EventKind::Connected))
        {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!(
            "ticket.submitted_fix".parse::<EventKind>().unwrap(),
            EventKind::TicketSubmittedFix
        );
        assert_eq!("connected".parse::<EventKind>().unwrap(), EventKind::Connected);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert_eq!(
            "ticket.deleted".parse::<EventKind>(),
            Err(ValidationError::unrecognized("event kind", "ticket.deleted"))
        );
    }

    #[test]
    fn connected_is_not_broadcastable() {
        assert!(!EventKind::Connected.is_broadcastable());
        assert!(!EventKind::BROADCASTABLE.contains(&EventKind::Connected));
        assert!(EventKind::BROADCASTABLE.iter().all(|k| k.is_broadcastable()));
    }
}
