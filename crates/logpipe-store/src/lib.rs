//! Idempotent log event persistence and read-side aggregation.
//!
//! Incoming payloads are loosely validated JSON objects. [`parse_raw_event`]
//! rejects bodies that are not usable at all, [`normalize`] folds everything
//! else into the canonical [`LogEvent`](logpipe_types::LogEvent) shape, and
//! [`ingest`] persists the result with insert-or-ignore semantics keyed on
//! `event_id`.
//!
//! Every function here borrows a [`rusqlite::Connection`]; acquiring and
//! pooling connections is the caller's concern.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logpipe_store::{ingest, parse_raw_event, FallbackId};
//!
//! let raw = parse_raw_event(br#"{"event_id":"e1","level":"critical"}"#)?;
//! let ack = ingest(&conn, &raw, chrono::Utc::now(), FallbackId::EpochMillis)?;
//! assert_eq!(ack.event_id, "e1");
//! ```

mod error;
mod normalize;
mod store;

pub use error::StoreError;
pub use normalize::{normalize, parse_raw_event, parse_timestamp, FallbackId, RawEvent};
pub use store::{count_by_level, ingest, insert_event, list_recent, Ack, DEFAULT_LIST_LIMIT};
