//! GetConnectionStatusHandler - Query handler for the live connection view.

use std::sync::Arc;

use crate::domain::push::ConnectionSnapshot;
use crate::ports::ConnectionReader;

/// Query for the current set of connected agents.
#[derive(Debug, Clone, Default)]
pub struct GetConnectionStatusQuery;

/// Result type for the status query.
pub type GetConnectionStatusResult = ConnectionSnapshot;

/// Reports who is connected right now.
///
/// The count and the agent list come from one copied summary list, so they
/// always agree even while channels come and go.
pub struct GetConnectionStatusHandler {
    reader: Arc<dyn ConnectionReader>,
}

impl GetConnectionStatusHandler {
    pub fn new(reader: Arc<dyn ConnectionReader>) -> Self {
        Self { reader }
    }

    pub fn handle(&self, _query: GetConnectionStatusQuery) -> GetConnectionStatusResult {
        self.snapshot()
    }

    /// Point-in-time snapshot of every live channel.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot::from_summaries(self.reader.list_summaries())
    }
}
