//! Metrics configuration.

use super::{ConfigError, Environment};

/// Configuration for Prometheus metrics collection
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: env.flag_or("METRICS_ENABLED", true)?,
        })
    }
}
