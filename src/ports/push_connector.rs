//! Client-side ports: where the credential comes from and how a push
//! connection is opened.
//!
//! The reconnecting client depends only on these two traits, so the HTTP
//! transport can be swapped for an in-process stream in tests.

use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Raw body chunks of an open push connection.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ConnectorError>>;

/// Errors raised while opening or reading a push connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The server refused the connection (non-2xx status).
    #[error("Push endpoint rejected connection with status {0}")]
    Rejected(u16),

    /// The connection could not be established.
    #[error("Push connection failed: {0}")]
    Connect(String),

    /// The connection broke while streaming.
    #[error("Push stream failed: {0}")]
    Stream(String),
}

/// Supplies the bearer credential obtained out-of-band (e.g. after login).
pub trait CredentialSource: Send + Sync {
    /// Current token, or `None` when the user is not logged in.
    fn token(&self) -> Option<String>;
}

/// Opens one long-lived push connection.
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Open a connection authenticated with `token`.
    async fn open(&self, token: &str) -> Result<ByteStream, ConnectorError>;
}

/// Credential holder that login/logout code can update at runtime.
#[derive(Debug, Default)]
pub struct SharedCredential {
    token: RwLock<Option<String>>,
}

impl SharedCredential {
    /// Creates an empty holder (logged out).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a holder with a token already present.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Stores a token after login.
    pub fn set(&self, token: impl Into<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    /// Forgets the token on logout.
    pub fn clear(&self) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl CredentialSource for SharedCredential {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
