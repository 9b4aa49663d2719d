//! Ephemeral cache abstraction shared by the batch client's request buffer,
//! the reputation analyzer's DNSBL cache, and the `emails`/`verdicts` queue
//! transport. All three are modeled as operations against Redis lists and
//! TTL'd keys rather than as three separate technologies.

mod error;
mod redis_cache;
mod scripts;

pub use error::{CacheError, Result};
pub use redis_cache::{RedisCache, RedisCacheConfig};

use std::time::Duration;

use async_trait::async_trait;

/// Operations the pipeline needs from a shared ephemeral store. Kept narrow
/// and Redis-shaped (atomic list push/pop/trim, TTL'd key-value) rather than
/// a generic cache trait, since every caller in this system needs exactly
/// these primitives and nothing else.
#[async_trait]
pub trait EphemeralCache: Send + Sync {
    /// Push a value onto the head of a list, returning the new length.
    async fn push(&self, key: &str, value: &str) -> Result<i64>;

    /// Current length of a list.
    async fn len(&self, key: &str) -> Result<i64>;

    /// Atomically pop up to `max` of the most-recently-pushed entries and
    /// trim the list down to whatever remains. Used by the batch client to
    /// drain its request buffer without racing concurrent `push`es.
    async fn pop_batch(&self, key: &str, max: i64) -> Result<Vec<String>>;

    /// Blocking pop from the tail of a list, used for queue consumption.
    /// Returns `None` on timeout (no message available).
    async fn blocking_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    /// Set a key with a TTL, used by the reputation analyzer's DNSBL cache.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Get a key's value if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}
