//! Collector handlers: ingest and the two read queries.
//!
//! Provides:
//! - `POST /collect`: normalize and store one event (duplicates ignored)
//! - `GET /logs?limit=N`: most recent events first
//! - `GET /analyze`: event counts per level

use crate::api::ApiError;
use crate::CollectorState;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Extension, Query},
    Json,
};
use logpipe_store::{count_by_level, ingest, list_recent, parse_raw_event, StoreError};
use logpipe_types::{Level, LogEvent};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Query parameters for `GET /logs`.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Maximum number of events to return (default: 500, no upper bound).
    pub limit: Option<u32>,
}

/// Response body for `GET /logs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    /// Events, newest first.
    pub logs: Vec<LogEvent>,
}

/// Response body for `GET /analyze`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Row count per level; levels without rows are absent.
    pub counts: BTreeMap<Level, u64>,
}

/// Runs a store operation on a pooled connection off the async runtime.
async fn with_connection<F, R>(state: &CollectorState, op: F) -> Result<R, ApiError>
where
    F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
    R: Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::Storage(format!("failed to get database connection: {e}")))?;
        op(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join error: {e}")))?
}

/// Handler for `POST /collect`.
///
/// The body is read as raw bytes so that any content type is accepted and a
/// malformed body yields a JSON error instead of axum's plain-text rejection.
pub async fn collect_handler(
    Extension(state): Extension<Arc<CollectorState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let raw = parse_raw_event(&body)?;
    let now = chrono::Utc::now();
    let fallback = state.fallback_id;

    with_connection(&state, move |conn| ingest(conn, &raw, now, fallback)).await?;

    Ok(Json(json!({ "status": "ok" })))
}

/// Handler for `GET /logs`.
pub async fn list_logs_handler(
    Extension(state): Extension<Arc<CollectorState>>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> Result<Json<LogsResponse>, ApiError> {
    let Query(params) = query.map_err(|e| {
        ApiError::BadRequest(format!("limit must be a non-negative integer: {e}"))
    })?;
    let limit = params.limit.unwrap_or(logpipe_store::DEFAULT_LIST_LIMIT);

    let logs = with_connection(&state, move |conn| list_recent(conn, limit)).await?;

    Ok(Json(LogsResponse { logs }))
}

/// Handler for `GET /analyze`.
pub async fn analyze_handler(
    Extension(state): Extension<Arc<CollectorState>>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let counts = with_connection(&state, count_by_level).await?;
    Ok(Json(AnalyzeResponse { counts }))
}
