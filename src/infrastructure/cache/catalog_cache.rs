//! Read-through cache for the public catalog and recommendations.
//!
//! Cache failures never fail a request: reads fall back to the database and
//! write errors are logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{keys, Cache, RedisCache};

#[derive(Clone)]
pub struct CatalogCache {
    cache: Option<RedisCache>,
    ttl_secs: u64,
    /// Invalidations seen by this cache and its clones
    generation: Arc<AtomicU64>,
}

impl CatalogCache {
    pub fn new(cache: Option<RedisCache>, ttl_secs: u64) -> Self {
        Self {
            cache,
            ttl_secs,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(None, 0)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Catalog cache read failed");
                None
            }
        }
    }

    pub async fn put<T: Serialize + Sync + Send>(&self, key: &str, value: &T) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_ex(key, value, self.ttl_secs).await {
                warn!(key, error = %e, "Catalog cache write failed");
            }
        }
    }

    /// Drop every cached catalog view after a hotel, room, service or booking change.
    pub async fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(generation, "Catalog cache invalidated");
        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .delete_many(&[keys::CATALOG, keys::RECOMMENDATIONS])
                .await
            {
                warn!(error = %e, "Catalog cache invalidation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_is_a_no_op() {
        let cache = CatalogCache::disabled();
        assert!(!cache.is_enabled());

        cache.put(keys::CATALOG, &vec![1, 2, 3]).await;
        let cached: Option<Vec<i32>> = cache.get(keys::CATALOG).await;
        assert!(cached.is_none());

        cache.invalidate().await;
    }

    #[tokio::test]
    async fn test_clones_share_invalidation_count() {
        let cache = CatalogCache::disabled();
        let handle = cache.clone();

        handle.invalidate().await;
        handle.invalidate().await;

        assert_eq!(cache.generation(), 2);
    }
}
