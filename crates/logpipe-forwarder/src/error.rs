//! Error types for the forwarding hop.

/// A single delivery attempt failed before a response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The attempt exceeded its per-request timeout.
    #[error("request to collector timed out")]
    Timeout,

    /// The collector could not be reached.
    #[error("failed to connect to collector: {0}")]
    Connect(String),

    /// Any other failure while sending the request or reading the response.
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Terminal outcome of a forward that did not reach the collector.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// No collector URL was configured, so there is nowhere to deliver to.
    #[error("collector destination is not configured")]
    NotConfigured,

    /// Every attempt failed at the transport level.
    #[error("delivery failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The failure of the final attempt.
        last: TransportError,
    },
}
