//! Service identity and listener configuration.

use url::Url;

use super::{ConfigError, Environment};

/// Name, environment and bind address of the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Number of actix workers. `None` keeps the actix default (one per core).
    pub workers: Option<usize>,
    /// Origins allowed to make cross-origin requests. `*` allows any origin;
    /// empty disables cross-origin access.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "keel-api".to_string(),
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            name: env.get_or("APP_NAME", &defaults.name).to_string(),
            environment: env
                .get_or("APP_ENV", &defaults.environment)
                .to_ascii_lowercase(),
            host: env.get_or("APP_HOST", &defaults.host).to_string(),
            port: env.parse_or("APP_PORT", defaults.port)?,
            workers: env.parse_optional("APP_WORKERS")?,
            allowed_origins: env
                .list("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .into_iter()
                .map(normalize_origin)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// Accept `*` or a `scheme://host[:port]` origin, without a trailing slash.
fn normalize_origin(raw: String) -> Result<String, ConfigError> {
    if raw == "*" {
        return Ok(raw);
    }
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: "ALLOWED_ORIGINS".to_string(),
        value: raw.clone(),
        reason: reason.to_string(),
    };

    let url = Url::parse(&raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid("expected an http(s) origin"));
    }
    if url.path() != "/" || url.query().is_some() {
        return Err(invalid("an origin has no path or query"));
    }
    Ok(url.origin().ascii_serialization())
}
