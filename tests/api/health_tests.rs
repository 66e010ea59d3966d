//! Health Check and Metrics Tests

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;

use crate::common::{json_body, text_body, TestApp};

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_liveness_check() {
    let app = TestApp::new().await;

    let response = app.get("/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "alive");
}

#[tokio::test]
async fn test_metrics_are_prometheus_text() {
    let app = TestApp::new().await;
    app.get("/health").await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain; version=0.0.4"));
    let body = text_body(response).await;
    assert!(body.contains("hotelflow_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
