//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod push;

pub use push::{
    GetConnectionStatusHandler, GetConnectionStatusQuery, GetConnectionStatusResult,
    PublishError, PublishEventCommand, PublishEventHandler, PublishEventResult,
};
