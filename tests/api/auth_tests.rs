//! Authentication API Tests
//!
//! Only the paths rejected before any query runs are exercised here.

use axum::http::StatusCode;
use fake::faker::name::en::Name;
use fake::Fake;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

use crate::common::{assert_error, unique_email, TestApp};
use hotelflow::domain::UserRole;

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new().await;
    let body = json!({
        "name": "Test Guest",
        "email": "not-an-email",
        "password": "ValidPassword123!"
    });

    let response = app.post_json("/api/v1/auth/register", &body).await;

    let body = assert_error(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["code"], 10007);
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new().await;
    let name: String = Name().fake();
    let body = json!({
        "name": name,
        "email": unique_email(),
        "password": "short"
    });

    let response = app.post_json("/api/v1/auth/register", &body).await;

    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_register_hotel_requires_hotel_name() {
    let app = TestApp::new().await;
    let body = json!({
        "name": "Owner",
        "email": unique_email(),
        "password": "ValidPassword123!",
        "hotel_name": "",
        "location": "Budapest"
    });

    let response = app.post_json("/api/v1/auth/register-hotel", &body).await;

    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn test_login_with_malformed_body_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/v1/auth/login", &json!({ "email": "a@b.c" }))
        .await;

    assert!(response.status().is_client_error());
}

#[test_case("/api/v1/auth/me" ; "profile")]
#[test_case("/api/v1/bookings/mine" ; "own bookings")]
#[test_case("/api/v1/rfid-keys" ; "key list")]
#[test_case("/api/v1/admin/stats" ; "admin stats")]
#[tokio::test]
async fn test_protected_route_requires_token(uri: &str) {
    let app = TestApp::new().await;

    let response = app.get(uri).await;

    let body = assert_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["code"], 10003);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/v1/auth/me", "not.a.jwt").await;

    assert_error(response, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = TestApp::new().await;
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &hotelflow::application::services::Claims {
            sub: "42".into(),
            role: UserRole::SuperAdmin,
            exp: chrono::Utc::now().timestamp() + 900,
            iat: chrono::Utc::now().timestamp(),
            jti: "forged".into(),
        },
        &jsonwebtoken::EncodingKey::from_secret(b"another-secret-that-is-also-long-enough"),
    )
    .unwrap();

    let response = app.get_auth("/api/v1/admin/stats", &token).await;

    assert_error(response, StatusCode::UNAUTHORIZED).await;
}
