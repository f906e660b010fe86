//! Response cache backed by a networked key-value store.
//!
//! The store is probed once at startup. When the probe fails the cache stays
//! disabled for the life of the process: reads report a miss and writes are
//! skipped without touching the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::error::{AppError, Result};

/// Lifetime of a cached chat reply, in seconds.
pub const CACHE_TTL_SECS: u64 = 3600;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Budget for a single GET or SETEX once the store is up.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}

/// Redis-backed store. The multiplexed connection is cheap to clone, so each
/// call works on its own handle. It is never re-established.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Opens a connection to `host:port` (database 0) and verifies it with `PING`.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let client = redis::Client::open(format!("redis://{}:{}/0", host, port))?;

        let connect = async {
            let mut conn = client.get_multiplexed_tokio_connection().await?;
            redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
            Ok::<_, AppError>(conn)
        };

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| AppError::CacheError(format!("Timed out connecting to {}:{}", host, port)))??;

        Ok(RedisStore { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// The cache layer handed to request handlers. `None` means disabled.
#[derive(Clone)]
pub struct ResponseCache {
    store: Option<Arc<dyn CacheStore>>,
    command_timeout: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        ResponseCache { store: Some(store), command_timeout: COMMAND_TIMEOUT }
    }

    pub fn disabled() -> Self {
        ResponseCache { store: None, command_timeout: COMMAND_TIMEOUT }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Connects to Redis, falling back to a disabled cache if the store is unreachable.
    pub async fn connect(host: &str, port: u16) -> Self {
        match RedisStore::connect(host, port).await {
            Ok(store) => {
                tracing::info!("Connected to Redis at {}:{}", host, port);
                ResponseCache::new(Arc::new(store))
            }
            Err(e) => {
                tracing::warn!("Redis connection failed: {}. Caching will be disabled.", e);
                ResponseCache::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// A store that stops answering yields `CacheError` after `command_timeout`.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match &self.store {
            Some(store) => tokio::time::timeout(self.command_timeout, store.get(key))
                .await
                .map_err(|_| AppError::CacheError(format!("GET {} timed out", key)))?,
            None => Ok(None),
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        match &self.store {
            Some(store) => tokio::time::timeout(self.command_timeout, store.set(key, value, ttl_secs))
                .await
                .map_err(|_| AppError::CacheError(format!("SETEX {} timed out", key)))?,
            None => Ok(()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[tokio::test]
    async fn disabled_cache_misses_and_ignores_writes() {
        let cache = ResponseCache::disabled();
        assert!(!cache.is_enabled());
        cache.set("chat:wheat", "sow in november", CACHE_TTL_SECS).await.unwrap();
        assert_eq!(cache.get("chat:wheat").await.unwrap(), None);
    }

    #[tokio::test]
    async fn enabled_cache_round_trips_through_store() {
        let store = Arc::new(MemoryStore::default());
        let cache = ResponseCache::new(store.clone());
        assert!(cache.is_enabled());

        cache.set("chat:wheat", "sow in november", CACHE_TTL_SECS).await.unwrap();
        assert_eq!(cache.get("chat:wheat").await.unwrap().as_deref(), Some("sow in november"));

        let ttl = store.ttl_of("chat:wheat").unwrap();
        assert!(ttl > Duration::from_secs(CACHE_TTL_SECS - 5));
        assert!(ttl <= Duration::from_secs(CACHE_TTL_SECS));
    }

    #[tokio::test]
    async fn later_writes_overwrite() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::default()));
        cache.set("chat:rice", "first", CACHE_TTL_SECS).await.unwrap();
        cache.set("chat:rice", "second", CACHE_TTL_SECS).await.unwrap();
        assert_eq!(cache.get("chat:rice").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn store_errors_are_returned_to_the_caller() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::failing()));
        assert!(matches!(cache.get("chat:rice").await, Err(AppError::CacheError(_))));
        assert!(matches!(cache.set("chat:rice", "x", 1).await, Err(AppError::CacheError(_))));
    }

    #[tokio::test]
    async fn stalled_store_times_out_as_cache_error() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::hanging()))
            .with_command_timeout(Duration::from_millis(50));
        assert!(matches!(cache.get("chat:rice").await, Err(AppError::CacheError(_))));
        assert!(matches!(cache.set("chat:rice", "x", 1).await, Err(AppError::CacheError(_))));
    }

    #[tokio::test]
    async fn unreachable_redis_disables_the_cache() {
        // Port 1 is reserved and nothing listens there in the test environment.
        let cache = ResponseCache::connect("127.0.0.1", 1).await;
        assert!(!cache.is_enabled());
    }
}
