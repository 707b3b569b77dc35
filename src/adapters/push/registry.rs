//! Connection registry: who is currently reachable for push.
//!
//! Holds at most one live channel per user. Registering a second channel for
//! the same user closes and replaces the first, so reloads and duplicate tabs
//! never leak connections.
//!
//! ```text
//! user u1 ──▶ Channel { connection c7, "Alice", admin, transport, heartbeat }
//! user u2 ──▶ Channel { connection c9, "Bob", fix_agent, transport, heartbeat }
//! ```
//!
//! # Thread Safety
//!
//! The map sits behind a `std::sync::RwLock`. No operation holds the lock
//! across an await point or while writing to a transport: fan-out takes a
//! copied recipient list and releases the lock before the first write.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::task::AbortHandle;

use crate::domain::foundation::{ConnectionId, UserId, UserRole};
use crate::domain::push::ChannelSummary;
use crate::ports::{ConnectionReader, PushTransport};

/// One live push channel.
struct Channel {
    connection_id: ConnectionId,
    username: String,
    role: UserRole,
    transport: Arc<dyn PushTransport>,
    heartbeat: Option<AbortHandle>,
}

impl Channel {
    /// Cancels the heartbeat and closes the transport.
    fn shut_down(self) {
        if let Some(heartbeat) = self.heartbeat {
            heartbeat.abort();
        }
        self.transport.close();
    }
}

/// A copied view of one channel, taken for delivery.
#[derive(Clone)]
pub struct Recipient {
    pub identity: UserId,
    pub connection_id: ConnectionId,
    pub transport: Arc<dyn PushTransport>,
}

/// Process-wide map of user → live push channel.
///
/// Owned by the composition root and shared by `Arc`; nothing else touches
/// the underlying map.
#[derive(Default)]
pub struct ConnectionRegistry {
    channels: RwLock<HashMap<UserId, Channel>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<UserId, Channel>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UserId, Channel>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a channel for `identity`, closing any channel it replaces.
    ///
    /// Returns the id of the new connection. Closing the replaced channel is
    /// best-effort.
    pub fn register(
        &self,
        identity: UserId,
        username: impl Into<String>,
        role: UserRole,
        transport: Arc<dyn PushTransport>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        let username = username.into();

        let (previous, active) = {
            let mut channels = self.write();
            let previous = channels.insert(
                identity.clone(),
                Channel {
                    connection_id,
                    username: username.clone(),
                    role,
                    transport,
                    heartbeat: None,
                },
            );
            (previous, channels.len())
        };

        let replaced = previous.is_some();
        if let Some(previous) = previous {
            tracing::debug!(
                user_id = %identity,
                connection_id = %previous.connection_id,
                "Closing superseded push channel"
            );
            previous.shut_down();
        }

        tracing::info!(
            user_id = %identity,
            connection_id = %connection_id,
            username = %username,
            role = %role,
            replaced,
            active,
            "Push channel connected"
        );

        connection_id
    }

    /// Attach the heartbeat task of a connection so removal can cancel it.
    ///
    /// If the connection is no longer current the heartbeat is cancelled
    /// immediately and `false` is returned.
    pub fn attach_heartbeat(
        &self,
        identity: &UserId,
        connection_id: ConnectionId,
        heartbeat: AbortHandle,
    ) -> bool {
        let mut channels = self.write();
        match channels.get_mut(identity) {
            Some(channel) if channel.connection_id == connection_id => {
                if let Some(stale) = channel.heartbeat.replace(heartbeat) {
                    stale.abort();
                }
                true
            }
            _ => {
                heartbeat.abort();
                false
            }
        }
    }

    /// Remove whatever channel `identity` holds. Idempotent.
    ///
    /// Returns `true` if a channel was removed.
    pub fn unregister(&self, identity: &UserId) -> bool {
        let (removed, active) = {
            let mut channels = self.write();
            let removed = channels.remove(identity);
            (removed, channels.len())
        };
        self.finish_removal(identity, removed, active)
    }

    /// Remove the channel of `identity` only if it is still `connection_id`.
    ///
    /// Used by a connection's own cleanup paths (disconnect, failed write,
    /// failed heartbeat) so a stale connection never evicts the newer channel
    /// that superseded it.
    pub fn unregister_connection(&self, identity: &UserId, connection_id: ConnectionId) -> bool {
        let (removed, active) = {
            let mut channels = self.write();
            let is_current = channels
                .get(identity)
                .map(|channel| channel.connection_id == connection_id)
                .unwrap_or(false);
            let removed = if is_current {
                channels.remove(identity)
            } else {
                None
            };
            (removed, channels.len())
        };
        self.finish_removal(identity, removed, active)
    }

    fn finish_removal(&self, identity: &UserId, removed: Option<Channel>, active: usize) -> bool {
        match removed {
            Some(channel) => {
                tracing::info!(
                    user_id = %identity,
                    connection_id = %channel.connection_id,
                    username = %channel.username,
                    active,
                    "Push channel disconnected"
                );
                channel.shut_down();
                true
            }
            None => false,
        }
    }

    /// Number of live channels.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Returns true if `identity` currently has a live channel.
    pub fn is_connected(&self, identity: &UserId) -> bool {
        self.read().contains_key(identity)
    }

    /// The connection id currently registered for `identity`.
    pub fn connection_of(&self, identity: &UserId) -> Option<ConnectionId> {
        self.read().get(identity).map(|channel| channel.connection_id)
    }

    /// Copy of every channel's display metadata.
    ///
    /// The returned list is detached from the registry and safe to hold
    /// while channels come and go.
    pub fn list_summaries(&self) -> Vec<ChannelSummary> {
        self.read()
            .values()
            .map(|channel| ChannelSummary {
                username: channel.username.clone(),
                role: channel.role,
            })
            .collect()
    }

    /// Copy of every live channel's delivery handle.
    pub fn recipients(&self) -> Vec<Recipient> {
        self.read()
            .iter()
            .map(|(identity, channel)| Recipient {
                identity: identity.clone(),
                connection_id: channel.connection_id,
                transport: Arc::clone(&channel.transport),
            })
            .collect()
    }

    /// Delivery handle of one user's channel.
    pub fn recipient(&self, identity: &UserId) -> Option<Recipient> {
        self.read().get(identity).map(|channel| Recipient {
            identity: identity.clone(),
            connection_id: channel.connection_id,
            transport: Arc::clone(&channel.transport),
        })
    }

    /// Close and remove every channel (graceful shutdown).
    ///
    /// Returns the number of channels closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Channel> = self.write().drain().map(|(_, channel)| channel).collect();
        let closed = drained.len();
        for channel in drained {
            channel.shut_down();
        }
        if closed > 0 {
            tracing::info!(closed, "Closed all push channels");
        }
        closed
    }
}

impl ConnectionReader for ConnectionRegistry {
    fn list_summaries(&self) -> Vec<ChannelSummary> {
        ConnectionRegistry::list_summaries(self)
    }

    fn count(&self) -> usize {
        ConnectionRegistry::count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::push::RecordingTransport;
    use proptest::prelude::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn register(
        registry: &ConnectionRegistry,
        id: &str,
        name: &str,
        role: UserRole,
    ) -> (ConnectionId, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let connection_id = registry.register(user(id), name, role, transport.clone());
        (connection_id, transport)
    }

    #[test]
    fn register_adds_channel() {
        let registry = ConnectionRegistry::new();
        register(&registry, "u1", "Alice", UserRole::Admin);

        assert_eq!(registry.count(), 1);
        assert!(registry.is_connected(&user("u1")));
    }

    #[test]
    fn reregistering_closes_and_replaces_previous_channel() {
        let registry = ConnectionRegistry::new();
        let (first_id, first) = register(&registry, "u1", "Alice", UserRole::Admin);
        let (second_id, second) = register(&registry, "u1", "Alice", UserRole::Admin);

        assert_ne!(first_id, second_id);
        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.connection_of(&user("u1")), Some(second_id));
    }

    #[test]
    fn only_latest_of_many_registrations_stays_open() {
        let registry = ConnectionRegistry::new();
        let transports: Vec<_> = (0..5)
            .map(|_| register(&registry, "u1", "Alice", UserRole::Admin).1)
            .collect();

        let (last, earlier) = transports.split_last().unwrap();
        assert!(!last.is_closed());
        assert!(earlier.iter().all(|t| t.is_closed()));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn unregister_removes_and_closes() {
        let registry = ConnectionRegistry::new();
        let (_, transport) = register(&registry, "u1", "Alice", UserRole::Admin);

        assert!(registry.unregister(&user("u1")));
        assert_eq!(registry.count(), 0);
        assert!(transport.is_closed());
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        register(&registry, "u1", "Alice", UserRole::Admin);

        assert!(registry.unregister(&user("u1")));
        assert!(!registry.unregister(&user("u1")));
        assert!(!registry.unregister(&user("never-connected")));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn stale_connection_cannot_evict_its_replacement() {
        let registry = ConnectionRegistry::new();
        let (stale_id, _) = register(&registry, "u1", "Alice", UserRole::Admin);
        let (current_id, current) = register(&registry, "u1", "Alice", UserRole::Admin);

        assert!(!registry.unregister_connection(&user("u1"), stale_id));
        assert_eq!(registry.connection_of(&user("u1")), Some(current_id));
        assert!(!current.is_closed());

        assert!(registry.unregister_connection(&user("u1"), current_id));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn list_summaries_is_a_detached_copy() {
        let registry = ConnectionRegistry::new();
        register(&registry, "u1", "Alice", UserRole::Admin);
        register(&registry, "u2", "Bob", UserRole::FixAgent);

        let summaries = registry.list_summaries();
        registry.unregister(&user("u1"));
        registry.unregister(&user("u2"));

        assert_eq!(summaries.len(), 2);
        assert!(summaries
            .iter()
            .any(|s| s.username == "Bob" && s.role == UserRole::FixAgent));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn recipients_reflect_current_connections() {
        let registry = ConnectionRegistry::new();
        let (id_a, _) = register(&registry, "u1", "Alice", UserRole::Admin);
        let (id_b, _) = register(&registry, "u2", "Bob", UserRole::FixAgent);

        let mut ids: Vec<_> = registry.recipients().iter().map(|r| r.connection_id).collect();
        ids.sort_by_key(|id| *id.as_uuid());
        let mut expected = vec![id_a, id_b];
        expected.sort_by_key(|id| *id.as_uuid());

        assert_eq!(ids, expected);
        assert!(registry.recipient(&user("u3")).is_none());
    }

    #[tokio::test]
    async fn unregister_cancels_attached_heartbeat() {
        let registry = ConnectionRegistry::new();
        let (connection_id, _) = register(&registry, "u1", "Alice", UserRole::Admin);

        let heartbeat = tokio::spawn(std::future::pending::<()>());
        assert!(registry.attach_heartbeat(&user("u1"), connection_id, heartbeat.abort_handle()));

        registry.unregister(&user("u1"));

        let result = heartbeat.await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn heartbeat_for_superseded_connection_is_cancelled_on_attach() {
        let registry = ConnectionRegistry::new();
        let (stale_id, _) = register(&registry, "u1", "Alice", UserRole::Admin);
        register(&registry, "u1", "Alice", UserRole::Admin);

        let heartbeat = tokio::spawn(std::future::pending::<()>());
        assert!(!registry.attach_heartbeat(&user("u1"), stale_id, heartbeat.abort_handle()));
        assert!(heartbeat.await.unwrap_err().is_cancelled());
    }

    #[test]
    fn close_all_closes_every_transport() {
        let registry = ConnectionRegistry::new();
        let (_, a) = register(&registry, "u1", "Alice", UserRole::Admin);
        let (_, b) = register(&registry, "u2", "Bob", UserRole::FixAgent);

        assert_eq!(registry.close_all(), 2);
        assert_eq!(registry.count(), 0);
        assert!(a.is_closed() && b.is_closed());
    }

    proptest! {
        #[test]
        fn count_is_registered_minus_unregistered(n in 0usize..24, m_seed in 0usize..24) {
            let m = if n == 0 { 0 } else { m_seed % (n + 1) };
            let registry = ConnectionRegistry::new();
            for i in 0..n {
                register(&registry, &format!("user-{i}"), "Agent", UserRole::FixAgent);
            }
            for i in 0..m {
                registry.unregister(&user(&format!("user-{i}")));
            }
            prop_assert_eq!(registry.count(), n - m);
        }
    }
}
