//! End-to-end tests of the HTTP routes over a file-backed log.

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use telemetryd::server::{router, AppState};
use telemetryd::{Config, FileLog, TelemetryLog};

struct TestApp {
    _dir: TempDir,
    log: Arc<FileLog>,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let log = Arc::new(FileLog::new(dir.path().join("telemetry.ndjson")));
        let config = Config::default();
        let app = router(AppState::new(log.clone(), &config), &config.server);
        Self {
            _dir: dir,
            log,
            app,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|err| panic!("router request failed: {err}"))
    }

    async fn post(&self, body: impl Into<Body>) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/telemetry")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|err| panic!("failed to read response body: {err}"));
    serde_json::from_slice(&bytes).unwrap_or_else(|err| panic!("body is not JSON: {err}"))
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[tokio::test]
async fn ingest_then_tail_returns_the_record() {
    let app = TestApp::new();

    let response = app.post(r#"{"sensor":"t1","value":42}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({"status": "ok"}));

    let response = app.get("/get_telemetry?limit=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let records = response_json(response).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["sensor"], "t1");
    assert_eq!(records[0]["value"], 42);

    let timestamp = records[0]["timestamp"].as_str().unwrap();
    assert!(timestamp.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn client_timestamp_is_replaced() {
    let app = TestApp::new();
    let client_ts = "1970-01-01T00:00:00Z";

    app.post(json!({"timestamp": client_ts, "v": 1}).to_string())
        .await;

    let records = app.log.scan_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_ne!(records[0].timestamp_str(), Some(client_ts));
    assert_eq!(records[0].fields().len(), 2);
}

#[tokio::test]
async fn empty_body_is_rejected_and_log_unchanged() {
    let app = TestApp::new();
    app.post(r#"{"seed":true}"#).await;
    let before = file_len(app.log.path());

    let response = app.post(Body::empty()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await, json!({"error": "Invalid JSON"}));

    assert_eq!(file_len(app.log.path()), before);
}

#[tokio::test]
async fn non_object_bodies_are_rejected() {
    let app = TestApp::new();

    for body in ["[1,2,3]", "\"hello\"", "12", "null", "{broken"] {
        let response = app.post(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
    assert!(!app.log.path().exists());
}

#[tokio::test]
async fn get_on_missing_log_is_empty() {
    let app = TestApp::new();

    let response = app.get("/get_telemetry").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!([]));
}

#[tokio::test]
async fn tail_drops_oldest_first() {
    let app = TestApp::new();
    for seq in 0..120 {
        app.post(json!({ "seq": seq }).to_string()).await;
    }

    // Default limit is 100.
    let records = response_json(app.get("/get_telemetry").await).await;
    let seqs: Vec<i64> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, (20..120).collect::<Vec<_>>());

    let records = response_json(app.get("/get_telemetry?limit=0").await).await;
    assert_eq!(records, json!([]));

    let records = response_json(app.get("/get_telemetry?limit=-5").await).await;
    assert_eq!(records, json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingests_produce_well_formed_lines() {
    let app = Arc::new(TestApp::new());

    let mut handles = Vec::new();
    for producer in 0..50 {
        let app = Arc::clone(&app);
        handles.push(tokio::spawn(async move {
            let body = json!({ "producer": producer, "payload": "x".repeat(2048) });
            app.post(body.to_string()).await.status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let contents = std::fs::read_to_string(app.log.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 50);
    for line in &lines {
        let value: Value = serde_json::from_str(line).expect("torn or merged line");
        assert!(value.is_object());
    }

    let records = response_json(app.get("/get_telemetry?limit=100").await).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 50);

    let mut producers: Vec<i64> = records
        .iter()
        .map(|r| r["producer"].as_i64().unwrap())
        .collect();
    producers.sort_unstable();
    assert_eq!(producers, (0..50).collect::<Vec<_>>());

    let stamps: Vec<&str> = records
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    let parsed: Vec<_> = stamps
        .iter()
        .map(|s| chrono::DateTime::parse_from_rfc3339(s).unwrap())
        .collect();
    assert!(parsed.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn records_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("telemetry.ndjson");
    let config = Config::default();

    {
        let log = Arc::new(FileLog::new(&path));
        let app = router(AppState::new(log, &config), &config.server);
        let request = Request::builder()
            .method("POST")
            .uri("/telemetry")
            .body(Body::from(r#"{"boot":1}"#))
            .unwrap();
        assert_eq!(app.oneshot(request).await.unwrap().status(), StatusCode::OK);
    }

    let log = Arc::new(FileLog::new(&path));
    let app = router(AppState::new(log, &config), &config.server);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/get_telemetry")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let records = response_json(response).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["boot"], 1);
}

#[tokio::test]
async fn corrupt_log_fails_the_query() {
    let app = TestApp::new();
    app.post(r#"{"ok":1}"#).await;
    std::fs::write(
        app.log.path(),
        "{\"ok\":1,\"timestamp\":\"2026-10-17T08:30:12.000000Z\"}\nnot json\n",
    )
    .unwrap();

    let response = app.get("/get_telemetry").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("line 2"));

    // Health does not depend on the log.
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({"status": "running"}));
}
