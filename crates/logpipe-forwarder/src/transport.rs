//! The outbound hop to the collector.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// What the collector answered. Any status, including 4xx and 5xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// Sends one JSON body to the collector.
///
/// An `Err` means no response was obtained and the attempt may be retried.
pub trait Transport: Send + Sync {
    /// Performs a single delivery attempt.
    fn send(
        &self,
        body: &[u8],
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport posting to a fixed collector URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Builds a transport whose every request carries `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// The collector URL this transport posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, body: &[u8]) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status().as_u16();
        // A body that cannot be read counts as a failed attempt.
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}
