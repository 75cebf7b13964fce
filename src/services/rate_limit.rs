//! Fixed-window rate limiting backed by an external counter store.
//!
//! The counter increment and its expiry are a single atomic operation in the
//! store. No state is kept in process, so limits hold across workers and
//! replicas.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    config::{RateLimitConfig, RateLimitKey},
    services::cache::CacheError,
};

/// Counter value after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    /// Seconds until the window resets.
    pub ttl: u64,
}

/// Store able to increment a counter that expires at the end of its window.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`, creating it with `window` expiry when absent.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError>;
}

/// Result of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Seconds until the window resets.
    pub reset_after: u64,
}

/// Per client and route request limiter
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Option<Arc<dyn CounterStore>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Option<Arc<dyn CounterStore>>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn key_strategy(&self) -> RateLimitKey {
        self.config.key
    }

    /// False when no store is configured or the threshold is zero.
    pub fn is_active(&self) -> bool {
        self.store.is_some() && self.config.is_enabled()
    }

    pub fn key_for(&self, client: &str, route: &str) -> String {
        format!("{}:{}:{}", self.config.prefix, client, route)
    }

    /// Count one request for `client` on `route`.
    ///
    /// Returns `Ok(None)` when limiting is inactive. Store failures are returned so
    /// the caller decides whether to fail open.
    pub async fn check(
        &self,
        client: &str,
        route: &str,
    ) -> Result<Option<RateLimitDecision>, CacheError> {
        let Some(store) = self.store.as_ref().filter(|_| self.config.is_enabled()) else {
            return Ok(None);
        };

        let window = Duration::from_secs(self.config.window_seconds);
        let counted = store.increment(&self.key_for(client, route), window).await?;
        let limit = self.config.requests_per_minute;

        Ok(Some(RateLimitDecision {
            allowed: counted.count <= limit,
            limit,
            remaining: limit.saturating_sub(counted.count),
            reset_after: counted.ttl.max(1),
        }))
    }
}
