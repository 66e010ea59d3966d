//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, route, and status
//! - HTTP request latency histograms
//! - Booking, RFID assignment and notification outcomes
//! - Database connection pool gauges

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "hotelflow";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, route, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Booking attempts by outcome ("created", "conflict", "rejected")
pub static BOOKINGS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookings_total", "Booking attempts by outcome").namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create BOOKINGS_TOTAL metric")
});

/// RFID assignment attempts by outcome ("assigned", "conflict", "rejected")
pub static RFID_ASSIGNMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rfid_assignments_total", "RFID key assignment attempts by outcome")
            .namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create RFID_ASSIGNMENTS_TOTAL metric")
});

/// Webhook deliveries by outcome ("delivered", "retried", "parked", "dropped")
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("notifications_total", "Hotel webhook deliveries by outcome")
            .namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create NOTIFICATIONS_TOTAL metric")
});

/// Database connection pool stats
pub static DB_POOL_CONNECTIONS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("db_pool_connections", "Database connection pool statistics")
            .namespace(NAMESPACE),
        &["state"], // "idle", "active", "max"
    )
    .expect("Failed to create DB_POOL_CONNECTIONS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(BOOKINGS_TOTAL.clone()))
        .expect("Failed to register BOOKINGS_TOTAL");
    registry
        .register(Box::new(RFID_ASSIGNMENTS_TOTAL.clone()))
        .expect("Failed to register RFID_ASSIGNMENTS_TOTAL");
    registry
        .register(Box::new(NOTIFICATIONS_TOTAL.clone()))
        .expect("Failed to register NOTIFICATIONS_TOTAL");
    registry
        .register(Box::new(DB_POOL_CONNECTIONS.clone()))
        .expect("Failed to register DB_POOL_CONNECTIONS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_booking(outcome: &str) {
    BOOKINGS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_rfid_assignment(outcome: &str) {
    RFID_ASSIGNMENTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_notification(outcome: &str) {
    NOTIFICATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Helper to update database pool stats
pub fn update_db_pool_stats(idle: u32, active: u32, max: u32) {
    DB_POOL_CONNECTIONS
        .with_label_values(&["idle"])
        .set(idle as f64);
    DB_POOL_CONNECTIONS
        .with_label_values(&["active"])
        .set(active as f64);
    DB_POOL_CONNECTIONS
        .with_label_values(&["max"])
        .set(max as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = &*REGISTRY;
        let _ = &*BOOKINGS_TOTAL;
        let _ = &*RFID_ASSIGNMENTS_TOTAL;
        let _ = &*NOTIFICATIONS_TOTAL;
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("hotelflow_http_requests_total"));
    }

    #[test]
    fn test_record_domain_outcomes() {
        record_booking("created");
        record_rfid_assignment("conflict");
        record_notification("parked");

        let metrics = gather_metrics();
        assert!(metrics.contains("hotelflow_bookings_total"));
        assert!(metrics.contains("hotelflow_rfid_assignments_total"));
        assert!(metrics.contains("hotelflow_notifications_total"));
    }
}
