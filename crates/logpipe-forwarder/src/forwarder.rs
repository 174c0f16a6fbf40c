//! Retry loop around a [`Transport`].

use crate::error::{ForwardError, TransportError};
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportResponse};

/// Result of a forward that reached the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The collector's HTTP status, whatever it was.
    pub status: u16,
    /// The collector's response body.
    pub body: String,
    /// How many attempts it took, starting at 1.
    pub attempts: u32,
}

/// Relays events to the collector. Holds no per-event state, so one
/// instance is shared by all inbound requests.
#[derive(Debug, Clone)]
pub struct Forwarder<T> {
    pub(crate) transport: Option<T>,
    policy: RetryPolicy,
}

impl<T: Transport> Forwarder<T> {
    /// Creates a forwarder. With `transport = None` the forwarder still
    /// accepts calls but every forward fails with
    /// [`ForwardError::NotConfigured`].
    pub fn new(transport: Option<T>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy: RetryPolicy::new(policy.max_attempts, policy.initial_backoff),
        }
    }

    /// Whether a collector destination is configured.
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// The retry policy in effect.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Delivers `body` to the collector, retrying transport failures.
    ///
    /// Runs to completion once started: the caller waits through every
    /// backoff delay. No delay follows the final attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::NotConfigured`] without attempting anything if
    /// there is no destination, or [`ForwardError::Exhausted`] once
    /// `max_attempts` attempts have all failed at the transport level.
    pub async fn forward(&self, body: &[u8]) -> Result<Delivery, ForwardError> {
        let transport = self.transport.as_ref().ok_or(ForwardError::NotConfigured)?;
        let max_attempts = self.policy.max_attempts;
        let mut last = TransportError::Other("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            match transport.send(body).await {
                Ok(TransportResponse { status, body }) => {
                    tracing::debug!(attempt, status, "forwarded event to collector");
                    return Ok(Delivery {
                        status,
                        body,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    if attempt < max_attempts {
                        let delay = self.policy.delay_after(attempt);
                        tracing::warn!(
                            attempt,
                            max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "delivery attempt failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last = e;
                }
            }
        }

        tracing::error!(attempts = max_attempts, error = %last, "giving up on event delivery");
        Err(ForwardError::Exhausted {
            attempts: max_attempts,
            last,
        })
    }
}
