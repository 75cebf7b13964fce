//! Connection settings for the external systems behind the service adapters.
//!
//! Every connection string is optional. An adapter without one is simply not
//! started and the endpoints depending on it answer `503`.

use super::{ConfigError, Environment};
use crate::utils::normalize_dsn_scheme;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            url: env.get("MYSQL_DSN").map(normalize_dsn_scheme),
            max_connections: env.parse_or("MYSQL_MAX_CONNECTIONS", 10)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: 16,
        }
    }
}

impl CacheConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            url: env.get_owned("REDIS_URL"),
            pool_size: env.parse_or("REDIS_POOL_SIZE", 16)?,
        })
    }
}

#[derive(Clone, Default)]
pub struct SearchConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_certs: bool,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("verify_certs", &self.verify_certs)
            .finish()
    }
}

impl SearchConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            host: env.get_owned("OPENSEARCH_HOST"),
            username: env.get_owned("OPENSEARCH_USERNAME"),
            password: env.get_owned("OPENSEARCH_PASSWORD"),
            verify_certs: env.flag_or("OPENSEARCH_VERIFY_CERTS", false)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub url: Option<String>,
    pub prefetch: u16,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: None,
            prefetch: 10,
        }
    }
}

impl QueueConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            url: env.get_owned("RABBITMQ_URL"),
            prefetch: env.parse_or("RABBITMQ_PREFETCH", 10)?,
        })
    }
}
