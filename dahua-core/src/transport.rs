//! HTTP transport seam for RPC2
//!
//! The client never talks to `reqwest` directly. Everything goes through
//! [`Transport`], so tests can script device replies and the caller can
//! hand in an HTTP client it already owns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Sends one JSON body and returns the raw response text
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url`. The body text is returned whatever the HTTP
    /// status; classifying the reply is the caller's job.
    async fn post(&self, url: &str, body: String) -> Result<String, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport with its own client and request timeout
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse a caller-supplied client (its timeout policy applies)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: String) -> Result<String, TransportError> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%status, url, "Non-success HTTP status from device");
        }

        Ok(resp.text().await?)
    }
}
