use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),

    #[error("Invalidation error: {0}")]
    Invalidation(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache, L2 is Redis shared across instances.
/// Without a Redis URL the manager runs on L1 alone.
pub struct CacheManager {
    redis: Option<ConnectionManager>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self::build(Some(redis), l1_size, ttl_secs))
    }

    /// L1-only cache
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self::build(None, l1_size, ttl_secs)
    }

    fn build(redis: Option<ConnectionManager>, l1_size: u64, ttl_secs: u64) -> Self {
        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .support_invalidation_closures()
            .build();

        Self {
            redis,
            l1_cache,
            ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn redis_enabled(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(mut conn) = self.redis.clone() {
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.hits.fetch_add(1, Ordering::Relaxed);

                // Populate L1 cache
                self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Like `get`, but a broken cache degrades to a miss
    pub async fn lookup<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self.get(key).await {
            Ok(value) => Some(value),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache.insert(key.to_string(), json.as_bytes().to_vec()).await;

        if let Some(mut conn) = self.redis.clone() {
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Best-effort `set`; failures are logged
    pub async fn store<T>(&self, key: &str, value: &T)
    where
        T: Serialize,
    {
        if let Err(e) = self.set(key, value).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(mut conn) = self.redis.clone() {
            let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        }
        Ok(())
    }

    /// Invalidate all entries matching a glob pattern (`*` wildcards only)
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        let owned = pattern.to_string();
        self.l1_cache
            .invalidate_entries_if(move |key, _| glob_match(&owned, key))
            .map_err(|e| CacheError::Invalidation(e.to_string()))?;

        if let Some(mut conn) = self.redis.clone() {
            // SCAN instead of KEYS so a large keyspace does not block Redis
            let mut cursor: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(200)
                    .query_async(&mut conn)
                    .await?;

                if !keys.is_empty() {
                    let _: () = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
                }

                if next == 0 {
                    break;
                }
                cursor = next;
            }
        }

        tracing::debug!("Invalidated cache pattern: {}", pattern);
        Ok(())
    }

    /// Drop every cached view that depends on `user_id`
    pub async fn invalidate_user(&self, user_id: Uuid) -> Result<(), CacheError> {
        self.delete(&CacheKey::profile(user_id)).await?;
        self.invalidate_pattern(&CacheKey::discover_pattern(user_id)).await?;
        self.invalidate_pattern(&CacheKey::compatibility_pattern(user_id)).await?;
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            redis_enabled: self.redis_enabled(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub redis_enabled: bool,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    pub fn profile(user_id: Uuid) -> String {
        format!("wp:profile:{}", user_id)
    }

    /// Whether the account behind a token may still act
    pub fn account_status(user_id: Uuid) -> String {
        format!("wp:account:{}", user_id)
    }

    /// Same key whichever side asks
    pub fn compatibility(a: Uuid, b: Uuid) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("wp:compat:{}:{}", low, high)
    }

    pub fn compatibility_pattern(user_id: Uuid) -> String {
        format!("wp:compat:*{}*", user_id)
    }

    /// One page of ranked discovery results
    pub fn discover(user_id: Uuid, offset: usize, limit: usize) -> String {
        format!("wp:discover:{}:{}:{}", user_id, offset, limit)
    }

    pub fn discover_pattern(user_id: Uuid) -> String {
        format!("wp:discover:{}:*", user_id)
    }
}

/// Glob match supporting `*` only, the subset Redis `MATCH` is given here
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}
