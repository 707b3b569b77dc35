//! ConnectionReader port - read-only view of who is connected.
//!
//! Status queries depend on this port rather than on the registry itself.

use crate::domain::push::ChannelSummary;

/// Read side of the connection registry.
pub trait ConnectionReader: Send + Sync {
    /// Copy of every live channel's display metadata.
    fn list_summaries(&self) -> Vec<ChannelSummary>;

    /// Number of live channels.
    fn count(&self) -> usize;
}
