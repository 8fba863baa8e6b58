use crate::cache::CacheClient;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached value with an optional expiry instant
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process cache backend.
///
/// Expiry is lazy: an expired entry is only removed when it is read.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Instant::now() + ttl);
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }
}

#[async_trait]
impl CacheClient for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let now = Instant::now();

        // The map guard must be released before removing the entry.
        match self.entries.get(key) {
            None => return Err(AppError::NotFound(format!("key '{}' not found", key))),
            Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
            Some(_) => {}
        }

        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        tracing::debug!(key = %key, "Evicted expired cache entry");

        Err(AppError::NotFound(format!("key '{}' expired", key)))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.insert(key, value, None);
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.insert(key, value, Some(ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let removed = keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn clean(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
