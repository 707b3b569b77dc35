//! Server side of a push channel's lifetime.
//!
//! Opening a channel:
//! 1. Create the bounded transport and its stream
//! 2. Register it, replacing any previous channel of the same user, and
//!    send the `connected` welcome to that channel only, before any broadcast
//!    can reach it
//! 3. Start the heartbeat and attach it to the registration
//!
//! The channel ends when the client goes away (stream dropped), a write or
//! heartbeat fails, a newer channel for the same user supersedes it, or the
//! server shuts down. Every path funnels into the registry, which cancels
//! the heartbeat and closes the transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::PushConfig;
use crate::domain::foundation::{AuthenticatedUser, ConnectionId, UserId};
use crate::domain::push::EventPayload;
use crate::ports::{PushFrame, PushTransport};

use super::transport::{ChannelStream, DisconnectGuard, MpscTransport};
use super::{ConnectionRegistry, EventBroadcaster};

/// Shortest heartbeat period; shorter requests are raised to it.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Opens and closes push channels.
#[derive(Clone)]
pub struct ChannelLifecycle {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<EventBroadcaster>,
    heartbeat_interval: Duration,
    channel_buffer: usize,
}

impl ChannelLifecycle {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broadcaster: Arc<EventBroadcaster>,
        heartbeat_interval: Duration,
        channel_buffer: usize,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            heartbeat_interval: heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL),
            channel_buffer,
        }
    }

    /// Build from the `push` configuration section.
    pub fn from_config(
        registry: Arc<ConnectionRegistry>,
        broadcaster: Arc<EventBroadcaster>,
        config: &PushConfig,
    ) -> Self {
        Self::new(
            registry,
            broadcaster,
            config.heartbeat_interval(),
            config.channel_buffer,
        )
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Open a channel for an authenticated user.
    ///
    /// Must be called within a tokio runtime (the heartbeat is spawned).
    pub fn open(&self, user: &AuthenticatedUser) -> ChannelStream {
        let (transport, receiver) = MpscTransport::channel(self.channel_buffer);
        let transport: Arc<dyn PushTransport> = Arc::new(transport);

        let connection_id =
            self.broadcaster
                .admit(user, Arc::clone(&transport), welcome_payload(user));

        let stream = ChannelStream::new(
            receiver,
            DisconnectGuard::new(Arc::clone(&self.registry), user.id.clone(), connection_id),
        );

        let heartbeat = spawn_heartbeat(
            Arc::clone(&self.registry),
            user.id.clone(),
            connection_id,
            transport,
            self.heartbeat_interval,
        );
        self.registry
            .attach_heartbeat(&user.id, connection_id, heartbeat.abort_handle());

        stream
    }

    /// Close whatever channel `identity` holds. Idempotent.
    pub fn close(&self, identity: &UserId) -> bool {
        self.registry.unregister(identity)
    }
}

fn welcome_payload(user: &AuthenticatedUser) -> EventPayload {
    match json!({
        "user_id": user.id,
        "username": user.username,
    }) {
        serde_json::Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}

/// Start the keep-alive loop for one connection.
///
/// The first heartbeat goes out one `period` after the call, with `period`
/// raised to [`MIN_HEARTBEAT_INTERVAL`]. A failed write unregisters the
/// connection and ends the task.
pub fn spawn_heartbeat(
    registry: Arc<ConnectionRegistry>,
    identity: UserId,
    connection_id: ConnectionId,
    transport: Arc<dyn PushTransport>,
    period: Duration,
) -> JoinHandle<()> {
    let period = period.max(MIN_HEARTBEAT_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = transport.write(PushFrame::Heartbeat) {
                tracing::info!(
                    user_id = %identity,
                    connection_id = %connection_id,
                    error = %e,
                    "Heartbeat failed, closing push channel"
                );
                registry.unregister_connection(&identity, connection_id);
                break;
            }

            tracing::trace!(user_id = %identity, "Heartbeat sent");
        }
    })
}
