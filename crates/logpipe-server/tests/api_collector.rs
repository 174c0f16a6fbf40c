//! Integration tests for the collector routes against an on-disk database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use logpipe_db::{open_with_retry, DbPool, DbRuntimeSettings, InitPolicy};
use logpipe_server::{collector_app, CollectorState};
use logpipe_store::FallbackId;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

struct TestCollector {
    app: Router,
    pool: DbPool,
    _dir: TempDir,
}

fn setup_with(fallback_id: FallbackId) -> TestCollector {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs.db");
    let pool = open_with_retry(
        path.to_str().unwrap(),
        DbRuntimeSettings::default(),
        InitPolicy::default(),
    )
    .unwrap();

    let app = collector_app(CollectorState {
        pool: pool.clone(),
        fallback_id,
    });
    TestCollector {
        app,
        pool,
        _dir: dir,
    }
}

fn setup() -> TestCollector {
    setup_with(FallbackId::EpochMillis)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = request
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn collect(app: &Router, event: Value) -> (StatusCode, Value) {
    send(app, "POST", "/collect", Some(event.to_string())).await
}

fn count_rows(pool: &DbPool, event_id: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM logs WHERE event_id = ?1",
        [event_id],
        |row| row.get(0),
    )
    .unwrap()
}

// ── health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_returns_ok() {
    let t = setup();
    let (status, body) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

// ── POST /collect ────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_normalize_dedupe_and_analyze() {
    let t = setup();
    let event = json!({"event_id": "e1", "level": "critical", "message": "hi"});

    let (status, body) = collect(&t.app, event.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let level: String = t
        .pool
        .get()
        .unwrap()
        .query_row("SELECT level FROM logs WHERE event_id = 'e1'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(level, "INFO");

    let (status, body) = collect(&t.app, event).await;
    assert_eq!(status, StatusCode::OK, "duplicates look like success");
    assert_eq!(body, json!({"status": "ok"}));
    assert_eq!(count_rows(&t.pool, "e1"), 1);

    let (status, _) = collect(&t.app, json!({"event_id": "e2", "level": "ERROR"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&t.app, "GET", "/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"counts": {"INFO": 1, "ERROR": 1}}));
}

#[tokio::test]
async fn collect_rejects_unusable_bodies() {
    let t = setup();
    for body in ["", "not json", "[1, 2]", "{}", "null"] {
        let (status, json) = send(&t.app, "POST", "/collect", Some(body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(json["error"].is_string(), "body {body:?} should get a JSON error");
    }

    let (_, body) = send(&t.app, "GET", "/analyze", None).await;
    assert_eq!(body, json!({"counts": {}}), "nothing should have been stored");
}

#[tokio::test]
async fn collect_accepts_bodies_without_content_type() {
    let t = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/collect")
        .body(Body::from(r#"{"event_id":"plain"}"#))
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count_rows(&t.pool, "plain"), 1);
}

#[tokio::test]
async fn collect_reports_storage_faults_as_500() {
    let t = setup();
    t.pool
        .get()
        .unwrap()
        .execute_batch("DROP TABLE logs;")
        .unwrap();

    let (status, body) = collect(&t.app, json!({"event_id": "lost"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().expect("error message");
    assert!(message.contains("logs"), "unexpected error: {message}");

    let (status, body) = send(&t.app, "GET", "/logs", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn concurrent_duplicate_ingest_leaves_one_row() {
    let t = setup();
    let mut handles = Vec::new();
    for i in 0..16 {
        let app = t.app.clone();
        handles.push(tokio::spawn(async move {
            collect(
                &app,
                json!({"event_id": "race", "message": format!("writer {i}")}),
            )
            .await
            .0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(count_rows(&t.pool, "race"), 1);
}

#[tokio::test]
async fn uuid_fallback_keeps_id_less_events_apart() {
    let t = setup_with(FallbackId::Uuid);
    for _ in 0..3 {
        let (status, _) = collect(&t.app, json!({"message": "no id"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&t.app, "GET", "/logs", None).await;
    assert_eq!(body["logs"].as_array().unwrap().len(), 3);
}

// ── GET /logs ────────────────────────────────────────────────────────

#[tokio::test]
async fn logs_are_newest_first_with_normalized_fields() {
    let t = setup();
    collect(
        &t.app,
        json!({"event_id": "old", "level": "debug", "client_name": "a", "timestamp": "2024-01-01T10:00:00Z"}),
    )
    .await;
    collect(
        &t.app,
        json!({"event_id": "new", "level": "WARNING", "message": "m", "timestamp": "2024-01-01T12:00:00+01:00"}),
    )
    .await;
    collect(
        &t.app,
        json!({"event_id": "mid", "timestamp": "2024-01-01T10:30:00Z"}),
    )
    .await;

    let (status, body) = send(&t.app, "GET", "/logs", None).await;
    assert_eq!(status, StatusCode::OK);

    let logs = body["logs"].as_array().unwrap();
    let ids: Vec<&str> = logs.iter().map(|l| l["event_id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["new", "mid", "old"]);

    assert_eq!(logs[0]["level"], "WARNING");
    assert_eq!(logs[0]["message"], "m");
    assert_eq!(logs[0]["client_name"], "unknown");
    assert_eq!(logs[0]["timestamp"], "2024-01-01T11:00:00Z");
    assert_eq!(logs[2]["level"], "DEBUG");
    assert_eq!(logs[2]["client_name"], "a");
    assert_eq!(logs[2]["message"], "");
}

#[tokio::test]
async fn logs_honour_limit() {
    let t = setup();
    for i in 0..5 {
        collect(
            &t.app,
            json!({"event_id": format!("e{i}"), "timestamp": format!("2024-01-01T00:00:0{i}Z")}),
        )
        .await;
    }

    let (status, body) = send(&t.app, "GET", "/logs?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["event_id"], "e4");
    assert_eq!(logs[1]["event_id"], "e3");

    let (_, body) = send(&t.app, "GET", "/logs?limit=0", None).await;
    assert_eq!(body, json!({"logs": []}));
}

#[tokio::test]
async fn logs_default_limit_is_500() {
    let t = setup();
    {
        let conn = t.pool.get().unwrap();
        let tx = conn.unchecked_transaction().unwrap();
        for i in 0..510 {
            tx.execute(
                "INSERT INTO logs (event_id, level, message, client_name, timestamp)
                 VALUES (?1, 'INFO', '', 'bulk', '2024-01-01T00:00:00.000000Z')",
                [format!("bulk-{i}")],
            )
            .unwrap();
        }
        tx.commit().unwrap();
    }

    let (_, body) = send(&t.app, "GET", "/logs", None).await;
    assert_eq!(body["logs"].as_array().unwrap().len(), 500);

    let (_, body) = send(&t.app, "GET", "/logs?limit=100000", None).await;
    assert_eq!(body["logs"].as_array().unwrap().len(), 510, "no upper cap");
}

#[tokio::test]
async fn logs_reject_malformed_limits() {
    let t = setup();
    for uri in ["/logs?limit=abc", "/logs?limit=-1", "/logs?limit=1.5"] {
        let (status, body) = send(&t.app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}

// ── GET /analyze ─────────────────────────────────────────────────────

#[tokio::test]
async fn analyze_on_empty_store_has_no_levels() {
    let t = setup();
    let (status, body) = send(&t.app, "GET", "/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"counts": {}}));
}

#[tokio::test]
async fn analyze_counts_every_level() {
    let t = setup();
    let levels = ["ERROR", "warning", "Warning ", "info", "DEBUG", "debug", "debug", "trace"];
    for (i, level) in levels.iter().enumerate() {
        collect(&t.app, json!({"event_id": format!("l{i}"), "level": level})).await;
    }

    let (_, body) = send(&t.app, "GET", "/analyze", None).await;
    assert_eq!(
        body,
        json!({"counts": {"ERROR": 1, "WARNING": 2, "INFO": 2, "DEBUG": 3}})
    );
}
