//! Domain layer containing the relay's types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, auth, errors)
//! - `push` - Push events, event kinds and connection status views
//! - `ticket` - Ticket lifecycle context used by event producers

pub mod foundation;
pub mod push;
pub mod ticket;
