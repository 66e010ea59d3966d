//! Role Guards, Device Auth and Request Validation Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

use crate::common::{assert_error, TestApp};
use hotelflow::domain::UserRole;

#[test_case(UserRole::Guest, "/api/v1/admin/stats" ; "guest stats")]
#[test_case(UserRole::Hotel, "/api/v1/admin/stats" ; "hotel admin stats")]
#[test_case(UserRole::Guest, "/api/v1/admin/users" ; "guest users")]
#[test_case(UserRole::Hotel, "/api/v1/admin/hotels" ; "hotel admin hotels")]
#[test_case(UserRole::Hotel, "/api/v1/admin/rfid-keys" ; "hotel admin all keys")]
#[tokio::test]
async fn test_admin_routes_require_super_admin(role: UserRole, uri: &str) {
    let app = TestApp::new().await;
    let token = app.token_for(1001, role);

    let response = app.get_auth(uri, &token).await;

    let body = assert_error(response, StatusCode::FORBIDDEN).await;
    assert_eq!(body["code"], 10004);
}

#[tokio::test]
async fn test_malformed_path_id_is_bad_request() {
    let app = TestApp::new().await;
    let token = app.token_for(1001, UserRole::Guest);

    let response = app.get_auth("/api/v1/bookings/not-a-number", &token).await;

    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_booking_without_rooms_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1001, UserRole::Guest);
    let body = json!({
        "start_date": "2026-12-01",
        "end_date": "2026-12-03",
        "room_ids": []
    });

    let response = app.post_json_auth("/api/v1/bookings", &body, &token).await;

    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_booking_with_malformed_room_id_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1001, UserRole::Guest);
    let body = json!({
        "start_date": "2026-12-01",
        "end_date": "2026-12-03",
        "room_ids": ["12", "room-b"]
    });

    let response = app.post_json_auth("/api/v1/bookings", &body, &token).await;

    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[test_case("/api/v1/devices/bookings" ; "sync")]
#[tokio::test]
async fn test_device_routes_require_device_token(uri: &str) {
    let app = TestApp::new().await;

    let response = app.get(uri).await;

    assert_error(response, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn test_device_access_requires_device_token() {
    let app = TestApp::new().await;
    let body = json!({ "uid": "04A1B2C3", "room_id": "1" });

    let response = app.post_json("/api/v1/devices/access", &body).await;

    assert_error(response, StatusCode::UNAUTHORIZED).await;
}
