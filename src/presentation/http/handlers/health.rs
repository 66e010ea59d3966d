//! Health Check Handlers
//!
//! Liveness and readiness checks plus the Prometheus scrape endpoint.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness check (is the server running?)
//! - `GET /health/ready` - Readiness check (can the server accept traffic?)
//! - `GET /metrics` - Prometheus text exposition

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::infrastructure::metrics;
use crate::startup::AppState;

static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ServiceHealth,
    pub redis: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    fn timed(latency: u64, degraded_after_ms: u64) -> Self {
        Self {
            status: if latency < degraded_after_ms {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            latency_ms: Some(latency),
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// Optional dependency not configured
    Disabled,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness check, 200 while the process serves requests
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness check
/// Returns 200 if ready, 503 if the database is unavailable
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let started_at = SERVER_START_TIME.to_rfc3339();

    let db_health = check_database(&state).await;
    let redis_health = check_redis(&state).await;

    let overall_status = determine_overall_status(&db_health, &redis_health);

    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime,
        started_at,
        checks: HealthChecks {
            database: db_health,
            redis: redis_health,
        },
    };

    let status_code = match overall_status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status_code, Json(response))
}

/// Prometheus metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let idle = state.db.num_idle() as u32;
    metrics::update_db_pool_stats(
        idle,
        state.db.size().saturating_sub(idle),
        state.settings.database.max_connections,
    );
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::gather_metrics(),
    )
}

async fn check_database(state: &AppState) -> ServiceHealth {
    let start = Instant::now();
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ServiceHealth::timed(start.elapsed().as_millis() as u64, 100),
        Err(e) => ServiceHealth::failed(format!("Database connection failed: {}", e)),
    }
}

async fn check_redis(state: &AppState) -> ServiceHealth {
    let Some(conn) = state.redis.as_ref() else {
        return ServiceHealth {
            status: HealthStatus::Disabled,
            latency_ms: None,
            message: None,
        };
    };

    let start = Instant::now();
    let mut conn = conn.clone();
    match redis::cmd("PING").query_async::<String>(&mut conn).await {
        Ok(_) => ServiceHealth::timed(start.elapsed().as_millis() as u64, 50),
        Err(e) => ServiceHealth::failed(format!("Redis connection failed: {}", e)),
    }
}

/// The database is critical; Redis only degrades rate limiting and caching
fn determine_overall_status(db: &ServiceHealth, redis: &ServiceHealth) -> HealthStatus {
    if db.status == HealthStatus::Unhealthy {
        return HealthStatus::Unhealthy;
    }

    if db.status == HealthStatus::Degraded
        || matches!(redis.status, HealthStatus::Unhealthy | HealthStatus::Degraded)
    {
        return HealthStatus::Degraded;
    }

    HealthStatus::Healthy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health(status: HealthStatus) -> ServiceHealth {
        ServiceHealth {
            status,
            latency_ms: None,
            message: None,
        }
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Healthy).unwrap();
        assert_eq!(json, "\"healthy\"");
        let json = serde_json::to_string(&HealthStatus::Disabled).unwrap();
        assert_eq!(json, "\"disabled\"");
    }

    #[test]
    fn test_determine_overall_status() {
        use HealthStatus::*;

        assert_eq!(determine_overall_status(&health(Healthy), &health(Healthy)), Healthy);
        assert_eq!(determine_overall_status(&health(Healthy), &health(Disabled)), Healthy);
        assert_eq!(determine_overall_status(&health(Degraded), &health(Healthy)), Degraded);
        assert_eq!(determine_overall_status(&health(Healthy), &health(Unhealthy)), Degraded);
        assert_eq!(determine_overall_status(&health(Unhealthy), &health(Healthy)), Unhealthy);
    }

    #[test]
    fn test_timed_thresholds() {
        assert_eq!(ServiceHealth::timed(10, 50).status, HealthStatus::Healthy);
        assert_eq!(ServiceHealth::timed(80, 50).status, HealthStatus::Degraded);
    }
}
