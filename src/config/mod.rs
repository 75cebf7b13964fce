//! Configuration structures and loading utilities.
//!
//! All settings are derived from an [`Environment`] snapshot: the process
//! environment (plus `.env`) optionally layered with values from the secret
//! store. [`Settings`] is built once at startup, rebuilt once after the secrets
//! bootstrap, and read-only afterwards.

pub mod app;
pub mod backends;
pub mod environment;
pub mod jwt;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod secrets;

pub use app::*;
pub use backends::*;
pub use environment::*;
pub use jwt::*;
pub use logging::*;
pub use metrics::*;
pub use rate_limit::*;
pub use secrets::*;

use thiserror::Error;

/// Errors raised while turning environment variables into settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("JWT_SECRET must be changed from its default value when APP_ENV is production")]
    InsecureJwtSecret,
}

/// Typed application settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub app: AppConfig,
    pub logging: LoggingConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: MetricsConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub queue: QueueConfig,
    pub secrets: SecretsConfig,
}

impl Settings {
    /// Parse and validate, including the production secret check.
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let settings = Self::parse(env)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse without the production checks. Used before the secrets bootstrap,
    /// which may still supply `JWT_SECRET`.
    pub fn parse(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            app: AppConfig::from_env(env)?,
            logging: LoggingConfig::from_env(env)?,
            jwt: JwtConfig::from_env(env)?,
            rate_limit: RateLimitConfig::from_env(env)?,
            metrics: MetricsConfig::from_env(env)?,
            database: DatabaseConfig::from_env(env)?,
            cache: CacheConfig::from_env(env)?,
            search: SearchConfig::from_env(env)?,
            queue: QueueConfig::from_env(env)?,
            secrets: SecretsConfig::from_env(env)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.is_production() && self.jwt.uses_default_secret() {
            return Err(ConfigError::InsecureJwtSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = Settings::from_env(&Environment::default()).unwrap();

        assert_eq!(settings.app.name, "keel-api");
        assert_eq!(settings.app.port, 8000);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.rate_limit.requests_per_minute, 60);
        assert_eq!(settings.rate_limit.key, RateLimitKey::ClientIp);
        assert_eq!(settings.jwt.algorithm, Algorithm::HS256);
        assert!(settings.jwt.uses_default_secret());
        assert!(settings.jwt.exempt_paths.contains(&"/health".to_string()));
        assert!(settings.database.url.is_none());
        assert!(settings.metrics.enabled);
    }

    #[test]
    fn test_reads_lists_and_lowercases_pii_fields() {
        let env = Environment::from_pairs([
            ("PII_FIELDS", "Email, Password ,,ssn"),
            ("AUTH_EXEMPT_PATHS", "/health,/public/*"),
        ]);
        let settings = Settings::from_env(&env).unwrap();

        assert_eq!(settings.logging.pii_fields, vec!["email", "password", "ssn"]);
        assert_eq!(settings.jwt.exempt_paths, vec!["/health", "/public/*"]);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let env = Environment::from_pairs([("RATE_LIMIT_PER_MINUTE", "lots")]);
        let err = Settings::from_env(&env).unwrap_err();

        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "RATE_LIMIT_PER_MINUTE");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let env = Environment::from_pairs([("JWT_ALGORITHM", "none")]);
        assert!(Settings::from_env(&env).is_err());
    }

    #[test]
    fn test_algorithm_is_case_insensitive() {
        let env = Environment::from_pairs([("JWT_ALGORITHM", "hs512")]);
        let settings = Settings::from_env(&env).unwrap();
        assert_eq!(settings.jwt.algorithm, Algorithm::HS512);
    }

    #[test]
    fn test_default_secret_refused_in_production() {
        let env = Environment::from_pairs([("APP_ENV", "production")]);
        assert!(matches!(
            Settings::from_env(&env),
            Err(ConfigError::InsecureJwtSecret)
        ));

        let env = Environment::from_pairs([("APP_ENV", "production"), ("JWT_SECRET", "s3cret")]);
        assert!(Settings::from_env(&env).is_ok());
    }

    #[test]
    fn test_parse_defers_production_check() {
        let env = Environment::from_pairs([("APP_ENV", "prod")]);
        let settings = Settings::parse(&env).unwrap();

        assert!(settings.app.is_production());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_sqlalchemy_dsn_is_normalized() {
        let env = Environment::from_pairs([(
            "MYSQL_DSN",
            "mysql+aiomysql://app:pw@db:3306/app",
        )]);
        let settings = Settings::from_env(&env).unwrap();
        assert_eq!(
            settings.database.url.as_deref(),
            Some("mysql://app:pw@db:3306/app")
        );
    }

    #[test]
    fn test_boolean_flags() {
        let env = Environment::from_pairs([
            ("METRICS_ENABLED", "off"),
            ("OPENSEARCH_VERIFY_CERTS", "YES"),
        ]);
        let settings = Settings::from_env(&env).unwrap();
        assert!(!settings.metrics.enabled);
        assert!(settings.search.verify_certs);

        let env = Environment::from_pairs([("METRICS_ENABLED", "maybe")]);
        assert!(Settings::from_env(&env).is_err());
    }

    #[test]
    fn test_merge_missing_keeps_existing_values() {
        let mut env = Environment::from_pairs([("JWT_SECRET", "from-env"), ("EMPTY", "")]);
        let added = env.merge_missing([
            ("JWT_SECRET".to_string(), "from-secret".to_string()),
            ("REDIS_URL".to_string(), "redis://cache:6379".to_string()),
            ("EMPTY".to_string(), "filled".to_string()),
        ]);

        assert_eq!(added, vec!["EMPTY", "REDIS_URL"]);
        assert_eq!(env.get("JWT_SECRET"), Some("from-env"));
        assert_eq!(env.get("REDIS_URL"), Some("redis://cache:6379"));
        assert_eq!(env.get("EMPTY"), Some("filled"));
    }
}
