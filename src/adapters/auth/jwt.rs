//! HS256 JWT adapter for bearer token validation.
//!
//! Implements the `SessionValidator` port for tokens minted by the login
//! service with a shared secret. Claims carry the account directly:
//!
//! ```text
//! { "id": "u1", "username": "Alice", "role": "admin", "iat": 1736496000, "exp": 1736499600 }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use void_relay::adapters::auth::JwtSessionValidator;
//!
//! let validator = JwtSessionValidator::from_config(&config.auth);
//! let user = validator.validate("eyJ...").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, UserRole};
use crate::ports::SessionValidator;

/// Claims carried by relay access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JwtClaims {
    id: String,
    username: String,
    role: String,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

/// Validates (and mints) HS256 bearer tokens.
pub struct JwtSessionValidator {
    secret: SecretString,
    issuer: Option<String>,
    token_ttl: Duration,
}

impl JwtSessionValidator {
    /// Create a validator with a shared secret.
    pub fn new(secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            issuer: None,
            token_ttl,
        }
    }

    /// Require (and stamp) an `iss` claim.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Build from the `auth` configuration section.
    pub fn from_config(config: &AuthConfig) -> Self {
        let validator = Self::new(config.jwt_secret.clone(), config.token_ttl());
        match &config.jwt_issuer {
            Some(issuer) => validator.with_issuer(issuer.clone()),
            None => validator,
        }
    }

    /// Mint a token for `user` valid for the configured TTL.
    pub fn issue(&self, user: &AuthenticatedUser) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.token_ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = JwtClaims {
            id: user.id.as_str().to_string(),
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            iss: self.issuer.clone(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AuthError::ServiceUnavailable("token signing failed".to_string())
        })
    }

    fn decode_claims(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.decode_claims(token)?;

        let user_id = UserId::new(&claims.id).map_err(|_| {
            tracing::warn!("Invalid user id in token");
            AuthError::InvalidToken
        })?;

        let role: UserRole = claims.role.parse().map_err(|_| {
            tracing::warn!(role = %claims.role, "Unknown role in token");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.username, role))
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.issuer)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
