//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.
//!
//! The router is built against a lazily connected pool and without Redis, so
//! every request that is answered before a query runs (health, auth guards,
//! validation) works without a database.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use hotelflow::application::services::Claims;
use hotelflow::config::Settings;
use hotelflow::domain::UserRole;
use hotelflow::infrastructure::cache::CatalogCache;
use hotelflow::infrastructure::database;
use hotelflow::infrastructure::invoices::{FileInvoiceStorage, PdfInvoiceRenderer};
use hotelflow::infrastructure::notifications::NotificationDispatcher;
use hotelflow::infrastructure::repositories::PgNotificationRepository;
use hotelflow::shared::snowflake::SnowflakeGenerator;
use hotelflow::startup::{build_router, AppState};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

/// Test application builder
pub struct TestApp {
    pub router: Router,
    pub settings: Arc<Settings>,
}

impl TestApp {
    pub async fn new() -> Self {
        let settings = Settings::from_builder(
            Settings::default_builder("test")
                .unwrap()
                .set_override("database.url", "postgres://localhost:5432/hotelflow_test")
                .unwrap()
                .set_override("jwt.secret", TEST_JWT_SECRET)
                .unwrap(),
        )
        .unwrap();

        let db = database::create_lazy_pool(&settings.database).unwrap();
        let snowflake = Arc::new(SnowflakeGenerator::new(u64::from(settings.snowflake.machine_id)));
        let notifier = NotificationDispatcher::spawn(
            settings.notifications.clone(),
            Arc::new(PgNotificationRepository::new(db.clone())),
            snowflake.clone(),
        );
        let storage_dir = std::env::temp_dir().join("hotelflow-test-invoices");

        let settings = Arc::new(settings);
        let state = AppState {
            db,
            redis: None,
            settings: settings.clone(),
            snowflake,
            catalog_cache: CatalogCache::disabled(),
            notifier: Arc::new(notifier),
            invoice_renderer: Arc::new(PdfInvoiceRenderer),
            invoice_storage: Arc::new(FileInvoiceStorage::new(storage_dir)),
        };

        Self {
            router: build_router(state),
            settings,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> Response {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json_auth(&self, uri: &str, body: &Value, token: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Signed access token for a user that need not exist in the database
    pub fn token_for(&self, user_id: i64, role: UserRole) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: now + 900,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt.secret.as_bytes()),
        )
        .unwrap()
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Asserts the status and the `code` field of an error body
pub async fn assert_error(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let body = json_body(response).await;
    assert_eq!(body["code"].as_u64().map(|c| c > 0), Some(true));
    assert!(body["message"].is_string());
    body
}

pub fn unique_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}
