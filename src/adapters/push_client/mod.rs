//! Client side of the push channel.
//!
//! - [`client`] - Reconnecting subscriber with an idle watchdog
//! - [`decoder`] - Incremental `text/event-stream` decoding
//! - [`http_connector`] - Opens the stream over HTTP
//! - [`mock`] - Scripted connector for tests

pub mod client;
pub mod decoder;
pub mod http_connector;
pub mod mock;

pub use client::{ClientConfig, ClientError, ClientState, PushClient};
pub use decoder::{SseDecoder, SseFrame};
pub use http_connector::HttpPushConnector;
pub use mock::{MockConnection, MockPushConnector};
