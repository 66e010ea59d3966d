//! Cache Service
//!
//! Generic cache trait and Redis implementation for application-wide caching.
//!
//! Values are stored as JSON strings.
//!
//! # Example
//!
//! ```rust,ignore
//! use hotelflow::infrastructure::cache::{Cache, RedisCache};
//!
//! let cache = RedisCache::with_prefix(redis_connection, "hotelflow:");
//! cache.set_ex("catalog:v1", &hotels, 600).await?;
//! let hotels: Option<Vec<CatalogHotel>> = cache.get("catalog:v1").await?;
//! ```

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::shared::error::AppError;

/// Generic cache trait for abstracting cache operations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Retrieves a value from the cache by key.
    ///
    /// # Returns
    /// * `Ok(Some(T))` - If the key exists and deserialization succeeds
    /// * `Ok(None)` - If the key does not exist
    /// * `Err(AppError)` - If a cache or deserialization error occurs
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Stores a value in the cache with an expiration time in seconds.
    async fn set_ex<T: Serialize + Sync + Send>(
        &self,
        key: &str,
        value: &T,
        seconds: u64,
    ) -> Result<(), AppError>;

    /// Deletes multiple keys, returning how many existed.
    async fn delete_many(&self, keys: &[&str]) -> Result<u64, AppError>;
}

/// Redis-backed cache implementation.
#[derive(Clone)]
pub struct RedisCache {
    /// Redis connection manager with automatic reconnection
    conn: ConnectionManager,
    /// Optional key prefix for namespacing
    prefix: Option<Arc<str>>,
}

impl RedisCache {
    /// Creates a RedisCache whose keys are all prefixed.
    pub fn with_prefix(conn: ConnectionManager, prefix: impl Into<Arc<str>>) -> Self {
        Self {
            conn,
            prefix: Some(prefix.into()),
        }
    }

    fn format_key(&self, key: &str) -> String {
        prefixed(self.prefix.as_deref(), key)
    }

    fn serialize<T: Serialize>(value: &T) -> Result<String, AppError> {
        serde_json::to_string(value).map_err(|e| {
            warn!("Cache serialization error: {}", e);
            AppError::Internal(format!("Cache serialization failed: {}", e))
        })
    }

    fn deserialize<T: DeserializeOwned>(data: &str) -> Result<T, AppError> {
        serde_json::from_str(data).map_err(|e| {
            warn!("Cache deserialization error: {}", e);
            AppError::Internal(format!("Cache deserialization failed: {}", e))
        })
    }
}

fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}{}", prefix, key),
        None => key.to_string(),
    }
}

#[async_trait]
impl Cache for RedisCache {
    #[instrument(skip(self), level = "debug")]
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, AppError> {
        let full_key = self.format_key(key);
        let mut conn = self.conn.clone();

        let result: Option<String> = conn.get(&full_key).await?;

        match result {
            Some(data) => {
                debug!(key = %full_key, "Cache hit");
                Ok(Some(Self::deserialize(&data)?))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_ex<T: Serialize + Sync + Send>(
        &self,
        key: &str,
        value: &T,
        seconds: u64,
    ) -> Result<(), AppError> {
        let full_key = self.format_key(key);
        let data = Self::serialize(value)?;
        let mut conn = self.conn.clone();

        let _: () = conn.set_ex(&full_key, data, seconds).await?;
        debug!(key = %full_key, ttl = seconds, "Cache set with expiry");

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_many(&self, keys: &[&str]) -> Result<u64, AppError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let full_keys: Vec<String> = keys.iter().map(|k| self.format_key(k)).collect();
        let mut conn = self.conn.clone();

        let deleted: u64 = conn.del(full_keys.as_slice()).await?;
        debug!(count = deleted, "Cache delete many");

        Ok(deleted)
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct CachedHotel {
        id: i64,
        name: String,
    }

    #[test]
    fn test_serialization() {
        let data = CachedHotel {
            id: 1,
            name: "Grand".to_string(),
        };

        let json = RedisCache::serialize(&data).unwrap();
        let parsed: CachedHotel = RedisCache::deserialize(&json).unwrap();

        assert_eq!(data, parsed);
    }

    #[test]
    fn test_prefixed_keys() {
        assert_eq!(prefixed(None, "catalog:v1"), "catalog:v1");
        assert_eq!(prefixed(Some("hotelflow:"), "catalog:v1"), "hotelflow:catalog:v1");
    }
}
