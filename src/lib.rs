//! Void Relay - Real-time event fan-out for the ticket tracker
//!
//! Agents and admins hold one server-sent event channel each. Ticket and
//! preview handlers publish events that are stamped, serialized once and
//! written to every open channel. A reconnecting client keeps a subscription
//! alive from the other end.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
