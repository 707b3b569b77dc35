//! Read-only status views of the connection registry.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserRole;

/// Display metadata of one live channel. Never used for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub username: String,
    pub role: UserRole,
}

/// Point-in-time view of every live channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub active_connections: usize,
    pub connected_agents: Vec<ChannelSummary>,
}

impl ConnectionSnapshot {
    /// Builds a snapshot from a copied summary list.
    pub fn from_summaries(connected_agents: Vec<ChannelSummary>) -> Self {
        Self {
            active_connections: connected_agents.len(),
            connected_agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_status_field_names() {
        let snapshot = ConnectionSnapshot::from_summaries(vec![ChannelSummary {
            username: "Alice".to_string(),
            role: UserRole::Admin,
        }]);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["active_connections"], 1);
        assert_eq!(json["connected_agents"][0]["username"], "Alice");
        assert_eq!(json["connected_agents"][0]["role"], "admin");
    }

    #[test]
    fn empty_snapshot_is_default() {
        assert_eq!(
            ConnectionSnapshot::from_summaries(Vec::new()),
            ConnectionSnapshot::default()
        );
    }
}
