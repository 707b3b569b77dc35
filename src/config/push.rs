//! Push channel configuration (server fan-out and client reconnect)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Push configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PushConfig {
    /// Seconds between keep-alive comments on each open channel
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Frames buffered per connection before writes start failing
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Client: fixed delay before the single reconnect attempt
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Client: silence after which the connection counts as lost
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Client: how many recent events to keep, newest first
    #[serde(default = "default_recent_events")]
    pub recent_events: usize,
}

impl PushConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Validate push configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        if self.channel_buffer == 0 {
            return Err(ValidationError::InvalidChannelBuffer);
        }
        if self.idle_timeout_secs <= self.heartbeat_interval_secs {
            return Err(ValidationError::IdleTimeoutTooShort);
        }
        if self.recent_events == 0 {
            return Err(ValidationError::InvalidRecentEvents);
        }
        Ok(())
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            channel_buffer: default_channel_buffer(),
            reconnect_delay_secs: default_reconnect_delay(),
            idle_timeout_secs: default_idle_timeout(),
            recent_events: default_recent_events(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_channel_buffer() -> usize {
    64
}

fn default_reconnect_delay() -> u64 {
    3
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_recent_events() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_config_defaults() {
        let config = PushConfig::default();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.channel_buffer, 64);
        assert_eq!(config.recent_events, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_heartbeat() {
        let config = PushConfig {
            heartbeat_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidHeartbeatInterval));
    }

    #[test]
    fn test_validation_zero_buffer() {
        let config = PushConfig {
            channel_buffer: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidChannelBuffer));
    }

    #[test]
    fn test_validation_idle_timeout_must_exceed_heartbeat() {
        let config = PushConfig {
            idle_timeout_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::IdleTimeoutTooShort));
    }
}
