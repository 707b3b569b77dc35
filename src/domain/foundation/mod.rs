//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, auth types and error types
//! that form the vocabulary of the relay.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, UserRole};
pub use errors::ValidationError;
pub use ids::{ConnectionId, UserId};
pub use timestamp::Timestamp;
