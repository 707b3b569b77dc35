//! Bearer credential validation.
//!
//! Credentials are minted out of band by the login service; the relay only
//! turns a presented token back into the user who holds it.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Maps a raw bearer token to the user it was issued to.
///
/// A bad signature or malformed token is `InvalidToken`, an expired one is
/// `TokenExpired`. `ServiceUnavailable` is reserved for validators that
/// depend on something that can be down.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// `token` is the bare credential, without any `Bearer ` prefix.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
