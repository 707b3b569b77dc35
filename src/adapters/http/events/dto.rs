//! Data Transfer Objects for the event endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;
use crate::domain::push::{EventKind, EventPayload};
use crate::ports::PublishReport;

/// Body of `POST /api/events/publish`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishEventRequest {
    pub kind: String,
    #[serde(default)]
    pub payload: EventPayload,
}

/// Outcome of a publish as reported to the producer.
#[derive(Debug, Clone, Serialize)]
pub struct PublishEventResponse {
    pub kind: EventKind,
    pub timestamp: String,
    pub delivered: usize,
    pub failed: Vec<UserId>,
}

impl From<PublishReport> for PublishEventResponse {
    fn from(report: PublishReport) -> Self {
        Self {
            kind: report.kind,
            timestamp: report.timestamp.to_iso_string(),
            delivered: report.delivered,
            failed: report.failed,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}
