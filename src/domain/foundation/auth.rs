//! Authentication types for the domain layer.
//!
//! These types represent an authenticated user extracted from a bearer token.
//! They have **no external dependencies** - any token scheme can populate them
//! via the `SessionValidator` port.
//!
//! # Example
//!
//! ```ignore
//! // In HTTP middleware, after token validation:
//! let user = AuthenticatedUser::new(UserId::new("u1")?, "Alice", UserRole::Admin);
//!
//! // Inject into request extensions for handlers to use
//! request.extensions_mut().insert(user);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{UserId, ValidationError};

/// Role carried by every account.
///
/// Roles gate routes; they never affect push routing (every channel receives
/// every broadcast).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Drafts tickets from voice reports.
    VoiceAgent,
    /// Claims tickets and submits fixes.
    FixAgent,
    /// Reviews fixes and approves or rejects them.
    Admin,
}

impl UserRole {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::VoiceAgent => "voice_agent",
            UserRole::FixAgent => "fix_agent",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice_agent" => Ok(UserRole::VoiceAgent),
            "fix_agent" => Ok(UserRole::FixAgent),
            "admin" => Ok(UserRole::Admin),
            other => Err(ValidationError::unrecognized("role", other)),
        }
    }
}

/// Authenticated user extracted from a validated token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Opaque user identifier; the push registry key.
    pub id: UserId,

    /// Human-readable name shown on the dashboard.
    pub username: String,

    /// Account role.
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }

    /// Returns true if the user holds one of the given roles.
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was presented at all.
    #[error("Authentication required")]
    MissingCredential,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired (separate from InvalidToken for specific handling).
    #[error("Token expired")]
    TokenExpired,

    /// User is authenticated but lacks the role required for this action.
    #[error("Forbidden: requires one of roles [{0}]")]
    InsufficientPermissions(String),

    /// The authentication service is unavailable (network, config, etc.).
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a permission error listing the accepted roles.
    pub fn requires_roles(roles: &[UserRole]) -> Self {
        let names: Vec<&str> = roles.iter().map(UserRole::as_str).collect();
        Self::InsufficientPermissions(names.join(", "))
    }

    /// Returns true if this error indicates the user should re-authenticate.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredential | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}
