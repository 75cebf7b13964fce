//! Bearer token validation settings.

use std::str::FromStr;

use jsonwebtoken::Algorithm;

use super::{ConfigError, Environment};

/// Placeholder secret shipped in the defaults. Refused in production.
pub const DEFAULT_JWT_SECRET: &str = "changeme";

/// Paths that never require a token unless overridden by `AUTH_EXEMPT_PATHS`.
pub const DEFAULT_EXEMPT_PATHS: &[&str] = &["/health", "/health/ready", "/metrics"];

#[derive(Clone)]
pub struct JwtConfig {
    /// Shared secret for HS* algorithms or a PEM encoded public key otherwise.
    pub secret: String,
    pub algorithm: Algorithm,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    /// Exact paths, or prefixes when the entry ends with `*`.
    pub exempt_paths: Vec<String>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("exempt_paths", &self.exempt_paths)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            algorithm: Algorithm::HS256,
            audience: None,
            issuer: None,
            exempt_paths: DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl JwtConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let algorithm = match env.get("JWT_ALGORITHM") {
            None => defaults.algorithm,
            Some(raw) => Algorithm::from_str(raw)
                .or_else(|_| Algorithm::from_str(&raw.to_ascii_uppercase()))
                .map_err(|_| ConfigError::InvalidValue {
                    key: "JWT_ALGORITHM".to_string(),
                    value: raw.to_string(),
                    reason: "unsupported JWT algorithm".to_string(),
                })?,
        };

        Ok(Self {
            secret: env.get_or("JWT_SECRET", DEFAULT_JWT_SECRET).to_string(),
            algorithm,
            audience: env.get_owned("JWT_AUDIENCE"),
            issuer: env.get_owned("JWT_ISSUER"),
            exempt_paths: env.list("AUTH_EXEMPT_PATHS").unwrap_or(defaults.exempt_paths),
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_JWT_SECRET
    }
}
