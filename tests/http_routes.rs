use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use message_logger::agent::config::Config;
use message_logger::comms::local_api::{create_router, AppState};
use message_logger::{MessageLogger, OutputLog, Payload};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

// Helper to create test config
fn test_config(output_path: PathBuf) -> Arc<Config> {
    Arc::new(Config {
        endpoint: "ws://localhost:8090".to_string(),
        output_path,
        status_port: Some(8091),
        ..Default::default()
    })
}

// Helper to create router around a fresh logger
fn test_router(dir: &TempDir) -> (Router, Arc<MessageLogger>) {
    let path = dir.path().join("data.csv");
    let logger = Arc::new(MessageLogger::new(OutputLog::new(&path)));
    let state = Arc::new(AppState::new(test_config(path), logger.clone()));
    (create_router(state), logger)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

#[tokio::test]
async fn test_health_while_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _logger) = test_router(&dir);

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn test_health_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (app, logger) = test_router(&dir);
    logger.stop();

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "down");
    assert_eq!(body["state"], "closed");
}

#[tokio::test]
async fn test_status_reports_counters() {
    let dir = tempfile::tempdir().unwrap();
    let (app, logger) = test_router(&dir);
    logger.on_message(&Payload::from("a")).unwrap();
    logger.on_message(&Payload::from("bc")).unwrap();

    let (status, body) = get_json(app, "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], "ws://localhost:8090");
    assert!(body["output_path"].as_str().unwrap().ends_with("data.csv"));
    assert_eq!(body["state"], "idle");
    assert_eq!(body["stats"]["messages_appended"], 2);
    assert_eq!(body["stats"]["bytes_appended"], 5);
    assert!(body["stats"]["last_message_at"].is_string());
    assert!(body["stats"]["started_at"].is_null());
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _logger) = test_router(&dir);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
