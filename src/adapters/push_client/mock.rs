//! Scripted push connector for testing the client.
//!
//! Each `open` consumes the next scripted connection. When the script runs
//! out, connections open and then stay silent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::ports::{ByteStream, ConnectorError, PushConnector};

/// One scripted outcome of `open`.
pub enum MockConnection {
    /// `open` fails.
    Reject(ConnectorError),
    /// Yields the chunks, then ends (server closed the response).
    Closing(Vec<Vec<u8>>),
    /// Yields the chunks, then stays open and silent.
    Hanging(Vec<Vec<u8>>),
    /// Yields whatever the test sends; ends when the sender is dropped.
    Live(mpsc::UnboundedReceiver<Result<Vec<u8>, ConnectorError>>),
}

/// Connector that plays back scripted connections.
#[derive(Default)]
pub struct MockPushConnector {
    script: Mutex<VecDeque<MockConnection>>,
    attempts: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

impl MockPushConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next unscripted `open`.
    pub fn then(self, connection: MockConnection) -> Self {
        self.push(connection);
        self
    }

    pub fn push(&self, connection: MockConnection) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(connection);
    }

    /// Queue a live connection and return the sender that feeds it.
    pub fn push_live(&self) -> mpsc::UnboundedSender<Result<Vec<u8>, ConnectorError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(MockConnection::Live(rx));
        tx
    }

    /// Number of times `open` was called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Tokens presented to `open`, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PushConnector for MockPushConnector {
    async fn open(&self, token: &str) -> Result<ByteStream, ConnectorError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token.to_string());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(MockConnection::Hanging(Vec::new()));

        match next {
            MockConnection::Reject(err) => Err(err),
            MockConnection::Closing(chunks) => Ok(stream::iter(chunks.into_iter().map(Ok)).boxed()),
            MockConnection::Hanging(chunks) => Ok(stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
            MockConnection::Live(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
        }
    }
}
