//! Stateless relay from an upstream caller to the log collector.
//!
//! [`Forwarder::forward`] pushes one opaque JSON body to the collector,
//! retrying transport failures (connect errors, timeouts, broken bodies)
//! with exponential backoff. An HTTP error status from the collector is a
//! completed delivery, not a transport failure, and is never retried.
//!
//! The outbound hop is abstracted by the [`Transport`] trait;
//! [`HttpTransport`] is the `reqwest` implementation used in production.

mod error;
mod forwarder;
mod retry;
mod transport;

pub use error::{ForwardError, TransportError};
pub use forwarder::{Delivery, Forwarder};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport, TransportResponse};
