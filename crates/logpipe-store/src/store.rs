//! Persistence operations for the `logs` table.
//!
//! Writes go through [`ingest`] (or [`insert_event`] for an already
//! normalized event), which relies on the `UNIQUE(event_id)` constraint and
//! `ON CONFLICT DO NOTHING` so that deduplication is a single atomic
//! statement.
//!
//! Reads are [`list_recent`] (newest first) and [`count_by_level`].

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use logpipe_types::{Level, LogEvent};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::error::StoreError;
use crate::normalize::{normalize, FallbackId, RawEvent};

/// Number of rows [`list_recent`] callers get when they do not ask for a
/// specific limit.
pub const DEFAULT_LIST_LIMIT: u32 = 500;

/// Acknowledgement for a successful ingest.
///
/// Has no "duplicate" flag: a repeated `event_id` is acknowledged exactly
/// like a first insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// The identifier the event was stored (or already present) under.
    pub event_id: String,
}

/// Normalizes a raw payload and stores it, ignoring duplicates.
///
/// # Errors
///
/// Returns `StoreError::Database` on any SQL failure. Nothing is retried.
pub fn ingest(
    conn: &Connection,
    raw: &RawEvent,
    now: DateTime<Utc>,
    fallback: FallbackId,
) -> Result<Ack, StoreError> {
    let event = normalize(raw, now, fallback);
    let inserted = insert_event(conn, &event)?;

    if inserted {
        tracing::debug!(event_id = %event.event_id, level = %event.level, "stored log event");
    } else {
        tracing::debug!(event_id = %event.event_id, "duplicate log event ignored");
    }

    Ok(Ack {
        event_id: event.event_id,
    })
}

/// Inserts an already normalized event. Returns `true` if a row was written,
/// `false` if an event with the same `event_id` already existed.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure.
pub fn insert_event(conn: &Connection, event: &LogEvent) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "INSERT INTO logs (event_id, level, message, client_name, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (event_id) DO NOTHING",
        params![
            event.event_id,
            event.level.as_str(),
            event.message,
            event.client_name,
            encode_timestamp(event.timestamp),
        ],
    )?;
    Ok(changed > 0)
}

/// Returns up to `limit` events, most recent `timestamp` first.
///
/// Events sharing a timestamp come back in reverse insertion order.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure or if a stored row cannot be
/// decoded.
pub fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<LogEvent>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT event_id, level, message, client_name, timestamp
         FROM logs
         ORDER BY timestamp DESC, id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], event_from_row)?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Counts stored events per level. Levels without rows are absent.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure.
pub fn count_by_level(conn: &Connection) -> Result<BTreeMap<Level, u64>, StoreError> {
    let mut stmt = conn.prepare("SELECT level, COUNT(*) FROM logs GROUP BY level")?;
    let rows = stmt.query_map([], |row| {
        let level = decode_level(row, 0)?;
        let count: i64 = row.get(1)?;
        Ok((level, count.unsigned_abs()))
    })?;

    let mut counts = BTreeMap::new();
    for row in rows {
        let (level, count) = row?;
        counts.insert(level, count);
    }
    Ok(counts)
}

/// Fixed-width UTC encoding: lexicographic order is chronological order.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<LogEvent> {
    let raw_ts: String = row.get(4)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_ts)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(LogEvent {
        event_id: row.get(0)?,
        level: decode_level(row, 1)?,
        message: row.get(2)?,
        client_name: row.get(3)?,
        timestamp,
    })
}

fn decode_level(row: &Row<'_>, idx: usize) -> rusqlite::Result<Level> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
