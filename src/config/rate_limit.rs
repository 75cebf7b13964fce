//! Rate limiting configuration.

use std::{fmt, str::FromStr};

use super::{ConfigError, Environment};

/// How the client part of a rate-limit key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitKey {
    /// Client IP address, honouring proxy headers.
    #[default]
    ClientIp,
    /// JWT `sub` claim, falling back to the client IP for anonymous requests.
    Subject,
}

impl FromStr for RateLimitKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ip" | "client_ip" => Ok(Self::ClientIp),
            "subject" | "sub" => Ok(Self::Subject),
            other => Err(format!("unknown rate limit key `{other}`, expected `ip` or `subject`")),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientIp => f.write_str("ip"),
            Self::Subject => f.write_str("subject"),
        }
    }
}

/// Configuration for the cache-backed rate limiter
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per client and route within one window. Zero disables limiting.
    pub requests_per_minute: u64,
    pub window_seconds: u64,
    pub key: RateLimitKey,
    pub prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            window_seconds: 60,
            key: RateLimitKey::ClientIp,
            prefix: "rate-limit".to_string(),
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            requests_per_minute: env
                .parse_or("RATE_LIMIT_PER_MINUTE", defaults.requests_per_minute)?,
            window_seconds: defaults.window_seconds,
            key: env.parse_or("RATE_LIMIT_KEY", defaults.key)?,
            prefix: env.get_or("RATE_LIMIT_PREFIX", &defaults.prefix).to_string(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.requests_per_minute > 0
    }
}
