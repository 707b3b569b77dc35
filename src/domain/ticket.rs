//! Ticket lifecycle context for event producers and payload consumers.
//!
//! The relay never enforces ticket state; these types exist so producers build
//! well-formed payloads and consumers can interpret `new_status` fields.
//!
//! ```text
//! PENDING ──claim──▶ IN_PROGRESS ──submit_fix──▶ REVIEW_PENDING ──approve──▶ APPROVED_FOR_PROD
//!    ▲                    ▲                            │
//!    │                    └──claim── REOPENED ◀──reject(request_changes)
//!    │                                                 └──reject──▶ CLOSED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::push::{EventKind, EventPayload};

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Pending,
    InProgress,
    ReviewPending,
    ApprovedForProd,
    Closed,
    Reopened,
}

impl TicketStatus {
    /// Validates a transition from this status to another.
    pub fn can_transition_to(&self, target: &TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress)
                | (Reopened, InProgress)
                | (InProgress, ReviewPending)
                | (ReviewPending, ApprovedForProd)
                | (ReviewPending, Closed)
                | (ReviewPending, Reopened)
        )
    }

    /// Returns true if an agent may claim a ticket in this status.
    pub fn is_claimable(&self) -> bool {
        matches!(self, TicketStatus::Pending | TicketStatus::Reopened)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::ApprovedForProd | TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Pending => "PENDING",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::ReviewPending => "REVIEW_PENDING",
            TicketStatus::ApprovedForProd => "APPROVED_FOR_PROD",
            TicketStatus::Closed => "CLOSED",
            TicketStatus::Reopened => "REOPENED",
        };
        write!(f, "{}", s)
    }
}

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// A ticket or preview state change, ready to publish.
///
/// Each variant maps to one [`EventKind`] and produces the payload fields
/// dashboard clients read.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketEvent {
    Created {
        ticket_id: String,
        title: String,
        priority: Priority,
        component: String,
    },
    Claimed {
        ticket_id: String,
        claimed_by: String,
    },
    FixSubmitted {
        ticket_id: String,
        summary: String,
        files_modified: Vec<String>,
        sandbox_preview_url: Option<String>,
        submitted_by: String,
    },
    Approved {
        ticket_id: String,
        approved_by: String,
        note: Option<String>,
    },
    Rejected {
        ticket_id: String,
        reason: String,
        request_changes: bool,
        rejected_by: String,
    },
    PreviewRegistered {
        preview_id: String,
        ticket_id: String,
        preview_url: String,
        registered_by: String,
    },
}

impl TicketEvent {
    /// The push event kind for this change.
    pub fn kind(&self) -> EventKind {
        match self {
            TicketEvent::Created { .. } => EventKind::TicketCreated,
            TicketEvent::Claimed { .. } => EventKind::TicketClaimed,
            TicketEvent::FixSubmitted { .. } => EventKind::TicketSubmittedFix,
            TicketEvent::Approved { .. } => EventKind::TicketApproved,
            TicketEvent::Rejected { .. } => EventKind::TicketRejected,
            TicketEvent::PreviewRegistered { .. } => EventKind::PreviewRegistered,
        }
    }

    /// The status a ticket is in after this change, if the change moves it.
    pub fn resulting_status(&self) -> Option<TicketStatus> {
        match self {
            TicketEvent::Created { .. } => Some(TicketStatus::Pending),
            TicketEvent::Claimed { .. } => Some(TicketStatus::InProgress),
            TicketEvent::FixSubmitted { .. } => Some(TicketStatus::ReviewPending),
            TicketEvent::Approved { .. } => Some(TicketStatus::ApprovedForProd),
            TicketEvent::Rejected { request_changes: true, .. } => Some(TicketStatus::Reopened),
            TicketEvent::Rejected { .. } => Some(TicketStatus::Closed),
            TicketEvent::PreviewRegistered { .. } => None,
        }
    }

    /// Builds the JSON payload carried by the push event.
    pub fn payload(&self) -> EventPayload {
        let value = match self {
            TicketEvent::Created { ticket_id, title, priority, component } => json!({
                "ticket_id": ticket_id,
                "title": title,
                "priority": priority,
                "component": component,
            }),
            TicketEvent::Claimed { ticket_id, claimed_by } => json!({
                "ticket_id": ticket_id,
                "claimed_by": claimed_by,
            }),
            TicketEvent::FixSubmitted {
                ticket_id,
                summary,
                files_modified,
                sandbox_preview_url,
                submitted_by,
            } => json!({
                "ticket_id": ticket_id,
                "summary": summary,
                "files_modified": files_modified,
                "sandbox_preview_url": sandbox_preview_url,
                "submitted_by": submitted_by,
            }),
            TicketEvent::Approved { ticket_id, approved_by, note } => json!({
                "ticket_id": ticket_id,
                "approved_by": approved_by,
                "note": note,
            }),
            TicketEvent::Rejected { ticket_id, reason, rejected_by, .. } => json!({
                "ticket_id": ticket_id,
                "reason": reason,
                "new_status": self.resulting_status(),
                "rejected_by": rejected_by,
            }),
            TicketEvent::PreviewRegistered { preview_id, ticket_id, preview_url, registered_by } => {
                json!({
                    "preview_id": preview_id,
                    "ticket_id": ticket_id,
                    "preview_url": preview_url,
                    "registered_by": registered_by,
                })
            }
        };

        match value {
            serde_json::Value::Object(map) => map,
            _ => EventPayload::new(),
        }
    }
}
