//! Normalization of loosely-typed client payloads into [`LogEvent`]s.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use logpipe_types::{Level, LogEvent, UNKNOWN_CLIENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A raw event as received over the wire: field name to arbitrary JSON value.
pub type RawEvent = Map<String, Value>;

/// How an `event_id` is synthesized for payloads that do not carry one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackId {
    /// Milliseconds since the Unix epoch at ingestion time. Two id-less
    /// events ingested in the same millisecond collapse into one row.
    #[default]
    EpochMillis,
    /// A random v4 UUID. Every id-less event becomes its own row.
    Uuid,
}

impl FallbackId {
    /// Generates a fallback identifier for an event ingested at `now`.
    pub fn generate(self, now: DateTime<Utc>) -> String {
        match self {
            Self::EpochMillis => now.timestamp_millis().to_string(),
            Self::Uuid => uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl std::str::FromStr for FallbackId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "epoch_millis" => Ok(Self::EpochMillis),
            "uuid" => Ok(Self::Uuid),
            other => Err(format!("unknown fallback id strategy: {other}")),
        }
    }
}

/// Parses a request body into a [`RawEvent`].
///
/// # Errors
///
/// Returns `StoreError::InvalidPayload` when the body is empty, is not valid
/// JSON, is not a JSON object, or is an object with no fields.
pub fn parse_raw_event(body: &[u8]) -> Result<RawEvent, StoreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(StoreError::InvalidPayload("empty body".to_string()));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| StoreError::InvalidPayload(format!("body is not valid JSON: {e}")))?;

    match value {
        Value::Object(map) if map.is_empty() => {
            Err(StoreError::InvalidPayload("event has no fields".to_string()))
        }
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidPayload(
            "expected a JSON object".to_string(),
        )),
    }
}

/// Builds the canonical event from a raw payload.
///
/// Total over all inputs: missing, null or mistyped fields fall back to
/// defaults instead of failing. `now` is the ingestion instant used for the
/// timestamp and id fallbacks.
pub fn normalize(raw: &RawEvent, now: DateTime<Utc>, fallback: FallbackId) -> LogEvent {
    let event_id = text_field(raw, "event_id")
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| fallback.generate(now));

    let level = Level::normalize(raw.get("level").and_then(Value::as_str));

    let timestamp = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now)
        .trunc_subsecs(6);

    LogEvent {
        event_id,
        level,
        message: text_field(raw, "message").unwrap_or_default(),
        client_name: text_field(raw, "client_name").unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        timestamp,
    }
}

/// Reads a field as text. Strings pass through, other non-null scalars and
/// containers are rendered as JSON.
fn text_field(raw: &RawEvent, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parses an ISO-8601 timestamp into a UTC instant.
///
/// Offsets (`Z`, `+05:30`) are honoured. Timestamps without an offset and
/// bare dates are taken to be UTC. Returns `None` for anything else,
/// including instants whose UTC year falls outside `0..=9999`: those have
/// no four-digit RFC3339 form and would not sort or read back as stored.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_any_instant(raw).filter(|ts| (0..=9999).contains(&ts.year()))
}

fn parse_any_instant(raw: &str) -> Option<DateTime<Utc>> {
    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}
