//! HTTP connector for the relay's `/api/events` stream.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;

use crate::ports::{ByteStream, ConnectorError, PushConnector};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens push connections over HTTP with a bearer credential.
///
/// The client carries no overall request timeout; liveness of an open stream
/// is judged by the subscriber's idle watchdog.
#[derive(Debug, Clone)]
pub struct HttpPushConnector {
    client: Client,
    endpoint: String,
}

impl HttpPushConnector {
    /// Connector for the relay at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: &str) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConnectorError::Connect(format!("HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: events_endpoint(base_url),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn events_endpoint(base_url: &str) -> String {
    format!("{}/api/events", base_url.trim_end_matches('/'))
}

#[async_trait]
impl PushConnector for HttpPushConnector {
    async fn open(&self, token: &str) -> Result<ByteStream, ConnectorError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ConnectorError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Push endpoint refused connection");
            return Err(ConnectorError::Rejected(status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ConnectorError::Stream(e.to_string()))
            })
            .boxed())
    }
}
