//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Cache implementations (Redis)
//! - Prometheus metrics
//! - Hotel webhook delivery (reqwest)
//! - Invoice PDF rendering and storage

pub mod cache;
pub mod database;
pub mod invoices;
pub mod metrics;
pub mod notifications;
pub mod repositories;
