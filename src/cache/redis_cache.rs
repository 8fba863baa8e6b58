use crate::cache::CacheClient;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Redis-backed cache.
///
/// The connection is opened on first use, so an unreachable server degrades
/// every operation into an error instead of failing startup. A failed
/// connection attempt is retried by the next operation.
pub struct RedisCache {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

/// Build a connection URL from the `cache` configuration section
pub fn redis_url(address: &str, password: &str, db: i64) -> Result<String> {
    let address = address.trim();
    if address.starts_with("redis://") || address.starts_with("rediss://") {
        return Ok(address.to_string());
    }

    let mut url = reqwest::Url::parse(&format!("redis://{}", address)).map_err(|e| {
        AppError::Configuration(format!("Invalid cache address '{}': {}", address, e))
    })?;

    if !password.is_empty() {
        url.set_password(Some(password)).map_err(|_| {
            AppError::Configuration(format!("Cache address '{}' cannot carry a password", address))
        })?;
    }
    url.set_path(&db.to_string());

    Ok(url.to_string())
}

impl RedisCache {
    /// Create a cache for the given URL without connecting yet
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            AppError::Configuration(format!("Failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    /// Create a cache and verify the server answers `PING`
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let cache = Self::new(redis_url)?;
        let mut conn = cache.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Cache(format!("Redis connection test failed: {}", e)))?;
        Ok(cache)
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| AppError::Cache(format!("Failed to connect to Redis: {}", e)))?;
                tracing::info!("Connected to Redis cache");
                Ok::<_, AppError>(manager)
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value.ok_or_else(|| AppError::NotFound(format!("key '{}' not found", key)))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return self.set(key, value).await;
        }

        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(keys.to_vec()).await?;
        Ok(removed)
    }

    async fn clean(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("FLUSHDB")
            .arg("ASYNC")
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
