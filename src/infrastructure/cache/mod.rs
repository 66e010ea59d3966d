//! Cache Module
//!
//! Redis connection management and caching utilities.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - A generic `Cache` trait for abstracting cache operations
//! - A `RedisCache` implementation
//! - `CatalogCache`, the read-through cache of public catalog views
//! - Predefined key names for consistent cache key naming
//!
//! Redis is optional. Without it the catalog is always read from the
//! database and rate limiting is skipped.
//!
//! # Example
//!
//! ```rust,ignore
//! use hotelflow::infrastructure::cache::{create_redis_client, CatalogCache, RedisCache};
//!
//! let conn = create_redis_client("redis://localhost:6379").await?;
//! let catalog = CatalogCache::new(Some(RedisCache::with_prefix(conn, keys::PREFIX)), 600);
//! ```

mod cache_service;
mod catalog_cache;

pub use cache_service::{Cache, RedisCache};
pub use catalog_cache::CatalogCache;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key names.
pub mod keys {
    /// Namespace prepended to every key
    pub const PREFIX: &str = "hotelflow:";

    /// Full hotel catalog
    pub const CATALOG: &str = "catalog:v1";

    /// Ranked recommendation list
    pub const RECOMMENDATIONS: &str = "recommendations:v1";

    /// Prefix for rate limiting counters (e.g., "ratelimit:auth:1.2.3.4")
    pub const RATE_LIMIT: &str = "ratelimit:";

    /// Generates a rate limit key
    #[inline]
    pub fn rate_limit(scope: &str, subject: impl std::fmt::Display) -> String {
        format!("{}{}{}:{}", PREFIX, RATE_LIMIT, scope, subject)
    }
}
