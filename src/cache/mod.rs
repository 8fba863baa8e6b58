//! Byte-oriented key/value cache with optional per-key expiry.
//!
//! Two interchangeable backends implement [`CacheClient`]: an in-process
//! [`InMemoryCache`] and a remote [`RedisCache`]. The backend is chosen once
//! at startup by [`create_cache`].

pub mod factory;
pub mod memory;
pub mod redis_cache;

pub use factory::create_cache;
pub use memory::{CacheEntry, InMemoryCache};
pub use redis_cache::RedisCache;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Cache operations shared by every backend
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a value; a missing or expired key is `AppError::NotFound`
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store a value without expiry
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Store a value that expires `ttl` after the write.
    ///
    /// A zero `ttl` stores the value without expiry.
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove keys, returning how many were actually present
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Remove everything
    async fn clean(&self) -> Result<()>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}
