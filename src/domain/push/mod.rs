//! Push domain - the vocabulary of real-time event fan-out.
//!
//! - [`EventKind`] - the fixed set of event kinds carried over push channels
//! - [`PushEvent`] - one immutable, timestamped event
//! - [`ChannelSummary`] / [`ConnectionSnapshot`] - read-only status views

mod event;
mod kind;
mod snapshot;

pub use event::{EventPayload, PushEvent};
pub use kind::EventKind;
pub use snapshot::{ChannelSummary, ConnectionSnapshot};
