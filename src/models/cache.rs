//! Cache endpoint payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_CACHE_TTL: u64 = 300;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CacheTtlQuery {
    /// Expiry in seconds, default 300.
    pub ttl: Option<u64>,
}

impl CacheTtlQuery {
    pub fn ttl(&self) -> u64 {
        self.ttl.unwrap_or(DEFAULT_CACHE_TTL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheWriteResponse {
    pub status: String,
    pub key: String,
    pub ttl: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheReadResponse {
    pub key: String,
    #[schema(value_type = Object)]
    pub value: Value,
}
