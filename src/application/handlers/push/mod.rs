//! Push handlers - status query and validated publish.

mod get_connection_status;
mod publish_event;

pub use get_connection_status::{
    GetConnectionStatusHandler, GetConnectionStatusQuery, GetConnectionStatusResult,
};
pub use publish_event::{
    PublishError, PublishEventCommand, PublishEventHandler, PublishEventResult,
};
