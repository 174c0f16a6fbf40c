//! Forwarder handler: `POST /logs` relays one event to the collector.

use crate::api::ApiError;
use crate::ForwarderState;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use logpipe_forwarder::Transport;
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler for `POST /logs`.
///
/// The body must be JSON and non-empty; beyond that it is relayed byte for
/// byte. The request blocks until the forward succeeds or exhausts its
/// retries. Whatever status the collector returned is reported in
/// `status_code`; only transport-level failure yields `502`.
pub async fn receive_handler<T>(
    Extension(state): Extension<Arc<ForwarderState<T>>>,
    body: Bytes,
) -> Response
where
    T: Transport + 'static,
{
    if let Err(reason) = check_event_body(&body) {
        return ApiError::BadRequest(reason).into_response();
    }

    match state.forwarder.forward(&body).await {
        Ok(delivery) => {
            if !(200..300).contains(&delivery.status) {
                tracing::warn!(
                    status = delivery.status,
                    body = %delivery.body,
                    "collector rejected forwarded event"
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "forwarded": true,
                    "status_code": delivery.status
                })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "forwarded": false,
                "error": e.to_string()
            })),
        )
            .into_response(),
    }
}

/// Accepts any JSON value except empty ones (`null`, `false`, `0`, `""`,
/// `[]`, `{}`).
fn check_event_body(body: &[u8]) -> Result<(), String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("body is not valid JSON: {e}"))?;

    let empty = match &value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    };

    if empty {
        Err("event body is empty".to_string())
    } else {
        Ok(())
    }
}
