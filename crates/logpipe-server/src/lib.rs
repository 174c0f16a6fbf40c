//! HTTP services of the logpipe ingestion pipeline.
//!
//! Two independent axum applications live here:
//!
//! | Service | Routes |
//! |---------|--------|
//! | collector | `POST /collect`, `GET /logs`, `GET /analyze`, `GET /health` |
//! | forwarder | `POST /logs`, `GET /health` |
//!
//! plus the synthetic [`generator`] that feeds the forwarder. Each has its
//! own binary under `src/bin/`.

pub mod api;
pub mod api_collector;
pub mod api_forwarder;
pub mod config;
pub mod generator;
pub mod runtime;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use logpipe_db::DbPool;
use logpipe_forwarder::{Forwarder, Transport};
use logpipe_store::FallbackId;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Maximum request body size (1 MiB). A single log event is far smaller.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// State shared by the collector's handlers.
#[derive(Clone)]
pub struct CollectorState {
    /// Database connection pool.
    pub pool: DbPool,
    /// How ids are synthesized for events that arrive without one.
    pub fallback_id: FallbackId,
}

/// State shared by the forwarder's handlers.
pub struct ForwarderState<T> {
    /// The relay to the collector.
    pub forwarder: Forwarder<T>,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the collector router.
pub fn collector_app(state: CollectorState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/collect", post(api_collector::collect_handler))
        .route("/logs", get(api_collector::list_logs_handler))
        .route("/analyze", get(api_collector::analyze_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
                .layer(Extension(Arc::new(state))),
        )
}

/// Builds the forwarder router around any [`Transport`].
pub fn forwarder_app<T>(state: ForwarderState<T>) -> Router
where
    T: Transport + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/logs", post(api_forwarder::receive_handler::<T>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
                .layer(Extension(Arc::new(state))),
        )
}
