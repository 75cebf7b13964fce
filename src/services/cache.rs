//! Redis adapter for JSON response caching and rate-limit counters.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::{
    RedisConnectionManager,
    bb8::{Pool, PooledConnection},
    redis::{self, RedisError},
};
use serde_json::Value;
use thiserror::Error;

use crate::{
    error::ApiError,
    services::rate_limit::{CounterStore, WindowCount},
};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(#[from] RedisError),
    #[error("value cannot be encoded as JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Unavailable(_) => ApiError::ServiceUnavailable("Cache unavailable".to_string()),
            CacheError::Command(e) if e.is_io_error() || e.is_connection_refusal() => {
                ApiError::ServiceUnavailable("Cache unavailable".to_string())
            }
            CacheError::Command(e) => ApiError::Upstream(e.to_string()),
            CacheError::Encode(e) => ApiError::internal(e.to_string()),
        }
    }
}

/// Key/value cache holding JSON documents with an expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Pooled Redis client
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisCache {
    /// Build the pool. Connections are opened lazily, so an unreachable server is
    /// only reported by the first command or [`CacheStore::ping`].
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, CacheError> {
        let manager = RedisConnectionManager::new(url)?;
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(Duration::from_secs(2))
            .build(manager)
            .await?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;

        // Values written by other clients may not be JSON; hand them back as text.
        Ok(raw.map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text))))
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for RedisCache {
    /// `SET NX EX` seeds the window, `INCR` counts and `TTL` reports the reset,
    /// all inside one MULTI/EXEC transaction.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError> {
        let window_secs = window.as_secs().max(1);
        let mut conn = self.connection().await?;

        let (count, ttl): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("EX")
            .arg(window_secs)
            .arg("NX")
            .ignore()
            .cmd("INCR")
            .arg(key)
            .cmd("TTL")
            .arg(key)
            .query_async(&mut *conn)
            .await?;

        let ttl = u64::try_from(ttl)
            .ok()
            .filter(|t| *t > 0)
            .unwrap_or(window_secs);

        Ok(WindowCount { count, ttl })
    }
}
