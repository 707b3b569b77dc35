//! Reconnecting push subscriber.
//!
//! Keeps a best-effort continuous subscription to the relay's event stream:
//!
//! ```text
//!            connect()                       stream ends / errors / goes idle
//! Disconnected ──────▶ Connecting ──▶ Connected ───────────────┐
//!      ▲                   │                                    │
//!      │                   └── open failed ──┐                  │
//!      │                                     ▼                  ▼
//!      └──────────── disconnect() ──  Disconnected + one reconnect after a fixed delay
//! ```
//!
//! At most one reconnect is pending at any time. Every `connect()` and
//! `disconnect()` starts a new generation; readers and reconnects of an older
//! generation are ignored when they report back.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::PushConfig;
use crate::domain::push::PushEvent;
use crate::ports::{ByteStream, ConnectorError, CredentialSource, PushConnector};

use super::decoder::{SseDecoder, SseFrame};

const EVENT_SUBSCRIBER_CAPACITY: usize = 256;

/// Errors surfaced by [`PushClient::connect`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No credential is available; no connection was attempted.
    #[error("Not authenticated: log in before connecting")]
    Unauthenticated,

    #[error("Push connection failed: {0}")]
    Connect(String),

    #[error("Push stream failed: {0}")]
    Stream(String),

    /// A later `connect()` or `disconnect()` overtook this attempt.
    #[error("Connection attempt superseded")]
    Superseded,
}

impl From<ConnectorError> for ClientError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Stream(msg) => ClientError::Stream(msg),
            other => ClientError::Connect(other.to_string()),
        }
    }
}

/// Observable connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Failed(ClientError),
}

/// Client tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Fixed delay before the single reconnect attempt.
    pub reconnect_delay: Duration,
    /// Silence after which an open connection counts as lost.
    pub idle_timeout: Duration,
    /// How many recent events to keep.
    pub recent_events: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&PushConfig::default())
    }
}

impl From<&PushConfig> for ClientConfig {
    fn from(config: &PushConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            idle_timeout: config.idle_timeout(),
            recent_events: config.recent_events.max(1),
        }
    }
}

/// Why an open connection was given up.
#[derive(Debug)]
enum LossReason {
    Closed,
    Idle(Duration),
    Failed(ConnectorError),
}

impl fmt::Display for LossReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossReason::Closed => f.write_str("server closed the stream"),
            LossReason::Idle(after) => write!(f, "no frame for {}s", after.as_secs()),
            LossReason::Failed(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Default)]
struct Session {
    generation: u64,
    reader: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl Session {
    /// Abort the reader and any pending reconnect.
    fn cancel_tasks(&mut self) -> bool {
        let mut cancelled = false;
        if let Some(reconnect) = self.reconnect.take() {
            reconnect.abort();
            cancelled = true;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
            cancelled = true;
        }
        cancelled
    }

    /// Start a new generation, closing whatever the previous one left open.
    fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        if self.cancel_tasks() {
            tracing::debug!("Closing previous push connection before reconnecting");
        }
        self.generation
    }

    fn has_pending_reconnect(&self) -> bool {
        self.reconnect
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

struct ClientInner {
    credentials: Arc<dyn CredentialSource>,
    connector: Arc<dyn PushConnector>,
    config: ClientConfig,
    state: watch::Sender<ClientState>,
    events: broadcast::Sender<PushEvent>,
    recent: Mutex<VecDeque<PushEvent>>,
    session: Mutex<Session>,
}

/// Subscriber to the relay's push stream. Cheap to clone.
#[derive(Clone)]
pub struct PushClient {
    inner: Arc<ClientInner>,
}

impl PushClient {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        connector: Arc<dyn PushConnector>,
        config: ClientConfig,
    ) -> Self {
        let (state, _) = watch::channel(ClientState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_SUBSCRIBER_CAPACITY);

        Self {
            inner: Arc::new(ClientInner {
                credentials,
                connector,
                config,
                state,
                events,
                recent: Mutex::new(VecDeque::with_capacity(config.recent_events)),
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// Open the push connection, closing any connection already open.
    ///
    /// Without a credential this fails with [`ClientError::Unauthenticated`],
    /// nothing is attempted and an open connection stays open. If opening fails, one reconnect is scheduled.
    /// Must be called within a tokio runtime.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.inner.connect().await
    }

    /// Close the connection and cancel any pending reconnect. Idempotent.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Current connection state.
    pub fn state(&self) -> ClientState {
        self.inner.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ClientState::Connected
    }

    /// Watch state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.inner.state.subscribe()
    }

    /// Receive every event parsed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.inner.events.subscribe()
    }

    /// The most recent events, newest first.
    pub fn recent_events(&self) -> Vec<PushEvent> {
        self.inner.recent().iter().cloned().collect()
    }

    /// Returns true while a reconnect is scheduled but has not yet started.
    pub fn has_pending_reconnect(&self) -> bool {
        self.inner.session().has_pending_reconnect()
    }
}

impl ClientInner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recent(&self) -> MutexGuard<'_, VecDeque<PushEvent>> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ClientState) {
        self.state.send_replace(state);
    }

    async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        // A missing credential leaves any open connection alone.
        let Some(token) = self.credentials.token() else {
            tracing::warn!("Push connect refused: no credential");
            if *self.state.borrow() != ClientState::Connected {
                self.set_state(ClientState::Failed(ClientError::Unauthenticated));
            }
            return Err(ClientError::Unauthenticated);
        };

        let generation = self.session().begin_attempt();
        self.open(generation, token).await
    }

    /// Open a connection for `generation`, which must already be current.
    async fn open(self: &Arc<Self>, generation: u64, token: String) -> Result<(), ClientError> {
        self.set_state(ClientState::Connecting);
        let opened = self.connector.open(&token).await;

        let mut session = self.session();
        if session.generation != generation {
            tracing::debug!("Push connect superseded while opening");
            return Err(ClientError::Superseded);
        }

        match opened {
            Ok(stream) => {
                session.reader = Some(tokio::spawn(read_stream(
                    Arc::downgrade(self),
                    generation,
                    stream,
                    self.config.idle_timeout,
                )));
                self.set_state(ClientState::Connected);
                drop(session);

                tracing::info!("Push connection open");
                Ok(())
            }
            Err(e) => {
                self.set_state(ClientState::Disconnected);
                drop(session);

                tracing::warn!(error = %e, "Push connect failed");
                self.schedule_reconnect(generation);
                Err(e.into())
            }
        }
    }

    fn disconnect(&self) {
        let mut session = self.session();
        session.generation += 1;
        let was_active = session.cancel_tasks();
        self.set_state(ClientState::Disconnected);

        if was_active {
            tracing::info!("Push client disconnected");
        }
    }

    /// Called by the reader of `generation` when its stream is gone.
    fn connection_lost(self: &Arc<Self>, generation: u64, reason: LossReason) {
        {
            let mut session = self.session();
            if session.generation != generation {
                return;
            }
            session.reader = None;
            self.set_state(ClientState::Disconnected);
        }

        tracing::warn!(reason = %reason, "Push connection lost");
        self.schedule_reconnect(generation);
    }

    /// Schedule the single reconnect for `generation`.
    fn schedule_reconnect(self: &Arc<Self>, generation: u64) {
        let mut session = self.session();
        if session.generation != generation {
            return;
        }
        if session.has_pending_reconnect() {
            tracing::debug!("Reconnect already pending");
            return;
        }

        let client = Arc::downgrade(self);
        let delay = self.config.reconnect_delay;
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Scheduling push reconnect"
        );

        session.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = client.upgrade() else {
                return;
            };
            {
                let mut session = inner.session();
                // A connect() or disconnect() that ran after the timer fired
                // owns the session now, even if its abort has not landed yet.
                if session.generation != generation {
                    return;
                }
                session.reconnect = None;
            }
            if let Err(e) = reconnect(inner).await {
                tracing::debug!(error = %e, "Reconnect attempt did not connect");
            }
        }));
    }

    fn handle_frame(&self, frame: SseFrame) {
        match frame {
            SseFrame::Comment(_) => tracing::trace!("Push heartbeat"),
            SseFrame::Data(data) => match PushEvent::from_json(&data) {
                Ok(event) => self.record(event),
                Err(e) => tracing::trace!(error = %e, "Dropping malformed push frame"),
            },
        }
    }

    fn record(&self, event: PushEvent) {
        {
            let mut recent = self.recent();
            recent.push_front(event.clone());
            recent.truncate(self.config.recent_events);
        }
        tracing::debug!(kind = %event.kind, "Push event received");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_tasks();
    }
}

fn reconnect(inner: Arc<ClientInner>) -> BoxFuture<'static, Result<(), ClientError>> {
    async move { inner.connect().await }.boxed()
}

async fn read_stream(
    client: Weak<ClientInner>,
    generation: u64,
    mut stream: ByteStream,
    idle_timeout: Duration,
) {
    let mut decoder = SseDecoder::new();

    let reason = loop {
        let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
            Ok(next) => next,
            Err(_) => break LossReason::Idle(idle_timeout),
        };
        let Some(inner) = client.upgrade() else {
            return;
        };
        match next {
            None => break LossReason::Closed,
            Some(Err(e)) => break LossReason::Failed(e),
            Some(Ok(chunk)) => {
                for frame in decoder.push(&chunk) {
                    inner.handle_frame(frame);
                }
            }
        }
    };

    if let Some(inner) = client.upgrade() {
        inner.connection_lost(generation, reason);
    }
}
