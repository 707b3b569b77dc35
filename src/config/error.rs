//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("JWT secret must be at least {0} bytes in production")]
    JwtSecretTooShort(usize),

    #[error("Token TTL must be greater than zero")]
    InvalidTokenTtl,

    #[error("Heartbeat interval must be greater than zero")]
    InvalidHeartbeatInterval,

    #[error("Channel buffer must hold at least one frame")]
    InvalidChannelBuffer,

    #[error("Idle timeout must exceed the heartbeat interval")]
    IdleTimeoutTooShort,

    #[error("Recent event history must hold at least one event")]
    InvalidRecentEvents,
}
