//! Log level and PII redaction settings.

use super::{ConfigError, Environment};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
    /// Field names redacted from structured log output, lowercased.
    pub pii_fields: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            pii_fields: Vec::new(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let level = env.get_or("LOG_LEVEL", "info").to_ascii_lowercase();
        let pii_fields = env
            .list("PII_FIELDS")
            .unwrap_or_default()
            .into_iter()
            .map(|field| field.to_ascii_lowercase())
            .collect();

        Ok(Self { level, pii_fields })
    }
}
