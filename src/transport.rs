//! The network exchange the scheduler depends on.
//!
//! The scheduler only ever talks to an [`Exchange`]; [`HttpTransport`] is the
//! `reqwest`-backed implementation used outside of tests.

use crate::request::{ExchangeResponse, RequestTarget};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// The exchange could not produce a response at all
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Performs a single network exchange for a target
#[async_trait]
pub trait Exchange: Send + Sync + 'static {
    async fn exchange(&self, target: &RequestTarget) -> Result<ExchangeResponse, TransportError>;
}

/// HTTP exchange backed by a shared `reqwest::Client`
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Exchange for HttpTransport {
    async fn exchange(&self, target: &RequestTarget) -> Result<ExchangeResponse, TransportError> {
        let mut request = self.client.request(target.method.clone(), &target.url);
        for (name, value) in &target.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &target.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let headers = response.headers().clone();

        // Headers have arrived; a body failure from here on belongs to the response.
        let exchanged = match response.bytes().await {
            Ok(bytes) => ExchangeResponse::new(status.as_u16(), status_text, bytes.to_vec()),
            Err(e) => {
                debug!(request = %target.describe(), error = %e, "Failed to read response body");
                ExchangeResponse::with_unreadable_body(status.as_u16(), status_text, e.to_string())
            }
        };

        Ok(exchanged.with_headers(headers))
    }
}
