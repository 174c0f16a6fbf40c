//! Shared types for the logpipe ingestion pipeline.
//!
//! This crate holds the canonical [`LogEvent`] shape and the closed set of
//! severity [`Level`]s. Every crate that touches a persisted or relayed event
//! goes through these definitions, so the normalized shape is defined once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels accepted by the store.
///
/// Raw client input is never persisted as-is: anything outside this set is
/// folded into [`Level::Info`] by [`Level::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// A failure that needs attention.
    Error,
    /// A degraded but recoverable condition.
    Warning,
    /// Routine operational information.
    Info,
    /// Diagnostic detail.
    Debug,
}

impl Level {
    /// All levels, in severity order.
    pub const ALL: [Level; 4] = [Level::Error, Level::Warning, Level::Info, Level::Debug];

    /// Returns the canonical uppercase label for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    /// Folds an arbitrary client-supplied value into one of the four levels.
    ///
    /// The value is trimmed and uppercased before matching. Absent, empty and
    /// unrecognized values all become [`Level::Info`].
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().to_ascii_uppercase().parse().ok())
            .unwrap_or(Self::Info)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = ParseLevelError;

    /// Strict parse of a canonical label. Use [`Level::normalize`] for
    /// untrusted input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ERROR" => Ok(Self::Error),
            "WARNING" => Ok(Self::Warning),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Error returned when parsing a string that is not a canonical level label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(pub String);

impl std::fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

/// A normalized log event, as persisted by the store and returned by its
/// read queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Idempotency key. Unique across all persisted events.
    pub event_id: String,
    /// Normalized severity.
    pub level: Level,
    /// Free-text message; may be empty.
    pub message: String,
    /// Name of the emitting client.
    pub client_name: String,
    /// When the event happened, as reported by the client or assigned at
    /// ingestion.
    pub timestamp: DateTime<Utc>,
}

/// Default `client_name` for events that do not carry one.
pub const UNKNOWN_CLIENT: &str = "unknown";
