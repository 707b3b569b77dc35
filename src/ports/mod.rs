//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Server Ports
//!
//! - `SessionValidator` - Bearer token validation
//! - `PushTransport` - Write-only sink to one client's push connection
//! - `EventPublisher` - What ticket/preview handlers publish through
//! - `ConnectionReader` - Read-only view of live channels
//!
//! ## Client Ports
//!
//! - `CredentialSource` - Where the subscriber's bearer token comes from
//! - `PushConnector` - Opens the long-lived push connection

mod connection_reader;
mod event_publisher;
mod push_connector;
mod push_transport;
mod session_validator;

pub use connection_reader::ConnectionReader;
pub use event_publisher::{EventPublisher, PublishReport};
pub use push_connector::{
    ByteStream, ConnectorError, CredentialSource, PushConnector, SharedCredential,
};
pub use push_transport::{PushFrame, PushTransport, TransportError};
pub use session_validator::SessionValidator;
