use crate::cache::redis_cache::redis_url;
use crate::cache::{CacheClient, InMemoryCache, RedisCache};
use crate::config::CacheConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the process-wide cache backend.
///
/// A non-empty `address` selects Redis, otherwise the in-process map is used.
pub fn create_cache(config: &CacheConfig) -> Result<Arc<dyn CacheClient>> {
    if config.address.trim().is_empty() {
        tracing::info!("Initializing in-memory cache backend");
        return Ok(Arc::new(InMemoryCache::new()));
    }

    let url = redis_url(&config.address, &config.password, config.db)?;
    tracing::info!(address = %config.address, db = config.db, "Initializing Redis cache backend");

    Ok(Arc::new(RedisCache::new(&url)?))
}
