//! Probe and metrics endpoints.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::Value;

#[tokio::test]
async fn liveness_does_not_touch_the_store() {
    let app = TestApp::new().await;
    app.ctx.store.set_unavailable(true);

    let response = app.server.get("/health/live").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn readiness_follows_the_store() {
    let app = TestApp::new().await;

    let response = app.server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["store_cluster"], "in-memory");
    assert_eq!(body["index"], "sanrio_characters");

    app.ctx.store.set_unavailable(true);
    let response = app.server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_endpoint_answers_without_recorder() {
    let app = TestApp::new().await;

    let response = app.server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().starts_with('#'));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = TestApp::new().await;
    let response = app.server.get("/villains").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
