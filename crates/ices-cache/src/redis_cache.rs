use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, Script};

use crate::error::{CacheError, Result};
use crate::scripts;
use crate::EphemeralCache;

#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    pub pool_size: usize,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
        }
    }
}

/// Redis-backed implementation of [`EphemeralCache`].
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    /// # Errors
    /// Returns [`CacheError::Connection`] if the pool cannot be built.
    pub fn new(config: &RedisCacheConfig) -> Result<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map_err(|e| CacheError::Connection(e.to_string()))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

#[async_trait]
impl EphemeralCache for RedisCache {
    async fn push(&self, key: &str, value: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        conn.lpush(key, value)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn len(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        conn.llen(key).await.map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn pop_batch(&self, key: &str, max: i64) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let script = Script::new(scripts::POP_BATCH);
        script
            .key(key)
            .arg(max)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn blocking_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        let result: Option<(String, String)> = conn
            .brpop(key, timeout.as_secs_f64())
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(result.map(|(_, value)| value))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(key).await.map_err(|e| CacheError::Backend(e.to_string()))
    }
}
