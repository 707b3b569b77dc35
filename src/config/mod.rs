//! Relay configuration.
//!
//! Three sections, all read from `VOID_RELAY__<SECTION>__<KEY>` environment
//! variables (a `.env` file is honoured in development):
//!
//! | Section  | Holds                                              |
//! |----------|----------------------------------------------------|
//! | `server` | bind address, environment, log filter, CORS        |
//! | `auth`   | HS256 signing secret, issuer, token lifetime       |
//! | `push`   | heartbeat period, channel buffer, client reconnect |
//!
//! ```no_run
//! use void_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod error;
mod push;
mod server;

pub use auth::{AuthConfig, MIN_PRODUCTION_SECRET_LEN};
pub use error::{ConfigError, ValidationError};
pub use push::PushConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration (HS256 secret)
    pub auth: AuthConfig,

    /// Push channel configuration (heartbeat, buffers, client reconnect)
    #[serde(default)]
    pub push: PushConfig,
}

impl AppConfig {
    /// Read `.env` (if any) and the `VOID_RELAY` environment.
    ///
    /// `VOID_RELAY__AUTH__JWT_SECRET` is the only required variable;
    /// `VOID_RELAY__PUSH__HEARTBEAT_INTERVAL_SECS=15` sets
    /// `push.heartbeat_interval_secs`, and so on for every field.
    ///
    /// Fails when the secret is missing or a value does not parse. Semantic
    /// checks are left to [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VOID_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.push.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("VOID_RELAY__AUTH__JWT_SECRET", "dev-secret");
    }

    fn clear_env() {
        env::remove_var("VOID_RELAY__AUTH__JWT_SECRET");
        env::remove_var("VOID_RELAY__SERVER__PORT");
        env::remove_var("VOID_RELAY__SERVER__ENVIRONMENT");
        env::remove_var("VOID_RELAY__PUSH__HEARTBEAT_INTERVAL_SECS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.auth.jwt_secret, "dev-secret");
        assert_eq!(config.push, PushConfig::default());
    }

    #[test]
    fn test_validate_minimal_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("VOID_RELAY__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::JwtSecretTooShort(MIN_PRODUCTION_SECRET_LEN))
        );
    }

    #[test]
    fn test_custom_heartbeat_interval() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("VOID_RELAY__PUSH__HEARTBEAT_INTERVAL_SECS", "15");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.push.heartbeat_interval_secs, 15);
        assert_eq!(config.push.channel_buffer, 64);
    }

    #[test]
    fn test_missing_secret_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
