//! Startup secrets bootstrap.
//!
//! A single secret holding a flat JSON object is fetched once and layered under
//! the existing environment. Failures are logged and never stop the service.

use async_trait::async_trait;
use aws_sdk_secretsmanager::{
    Client,
    config::{BehaviorVersion, Region},
    error::DisplayErrorContext,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Environment, SecretsConfig};

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("failed to fetch secret `{name}`: {reason}")]
    Fetch { name: String, reason: String },
    #[error("secret `{0}` has no string value")]
    Empty(String),
    #[error("secret payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("secret payload must be a JSON object")]
    NotAnObject,
}

/// Anything able to return the raw payload of a named secret.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, SecretsError>;
}

pub struct AwsSecretsManager {
    client: Client,
}

impl AwsSecretsManager {
    /// Load credentials from the default provider chain, overriding the region
    /// when one is configured.
    pub async fn from_config(config: &SecretsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;
        Self {
            client: Client::new(&shared),
        }
    }
}

#[async_trait]
impl SecretSource for AwsSecretsManager {
    async fn fetch(&self, name: &str) -> Result<String, SecretsError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| SecretsError::Fetch {
                name: name.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| SecretsError::Empty(name.to_string()))
    }
}

/// Flatten a JSON object into variable pairs. Strings are taken verbatim, other
/// values keep their JSON text.
pub fn parse_secret_payload(payload: &str) -> Result<Vec<(String, String)>, SecretsError> {
    let Value::Object(map) = serde_json::from_str::<Value>(payload)? else {
        return Err(SecretsError::NotAnObject);
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => (key, text),
            other => (key, other.to_string()),
        })
        .collect())
}

/// Fetch the configured secret and add its keys to `env` where they are unset.
///
/// Returns the keys that were added. Does nothing when no secret name is set.
pub async fn bootstrap_secrets(
    config: &SecretsConfig,
    source: &dyn SecretSource,
    env: &mut Environment,
) -> Vec<String> {
    let Some(name) = config.secret_name.as_deref() else {
        return Vec::new();
    };

    let pairs = match source.fetch(name).await.and_then(|raw| parse_secret_payload(&raw)) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!(secret = %name, error = %e, "Secrets bootstrap failed, continuing with environment only");
            return Vec::new();
        }
    };

    let added = env.merge_missing(pairs);
    info!(secret = %name, keys = added.len(), "Secrets loaded");
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSecret(&'static str);

    #[async_trait]
    impl SecretSource for StaticSecret {
        async fn fetch(&self, _: &str) -> Result<String, SecretsError> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl SecretSource for Unreachable {
        async fn fetch(&self, name: &str) -> Result<String, SecretsError> {
            Err(SecretsError::Fetch {
                name: name.to_string(),
                reason: "dispatch failure".to_string(),
            })
        }
    }

    fn named() -> SecretsConfig {
        SecretsConfig {
            region: Some("eu-west-1".to_string()),
            secret_name: Some("keel/dev".to_string()),
        }
    }

    #[test]
    fn test_payload_values_are_stringified() {
        let pairs = parse_secret_payload(r#"{"JWT_SECRET": "abc", "RATE_LIMIT_PER_MINUTE": 5}"#)
            .unwrap();
        assert!(pairs.contains(&("JWT_SECRET".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("RATE_LIMIT_PER_MINUTE".to_string(), "5".to_string())));
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        assert!(matches!(
            parse_secret_payload("[1, 2]"),
            Err(SecretsError::NotAnObject)
        ));
        assert!(matches!(
            parse_secret_payload("not json"),
            Err(SecretsError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_secret_fills_only_missing_keys() {
        let mut env = Environment::from_pairs([("JWT_SECRET", "local")]);
        let source = StaticSecret(r#"{"JWT_SECRET": "remote", "REDIS_URL": "redis://r:6379"}"#);

        let added = bootstrap_secrets(&named(), &source, &mut env).await;

        assert_eq!(added, vec!["REDIS_URL"]);
        assert_eq!(env.get("JWT_SECRET"), Some("local"));
        assert_eq!(env.get("REDIS_URL"), Some("redis://r:6379"));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_environment_untouched() {
        let mut env = Environment::from_pairs([("APP_NAME", "svc")]);
        let before = env.clone();

        let added = bootstrap_secrets(&named(), &Unreachable, &mut env).await;

        assert!(added.is_empty());
        assert_eq!(env, before);
    }

    #[tokio::test]
    async fn test_skipped_without_secret_name() {
        let mut env = Environment::default();
        let added = bootstrap_secrets(&SecretsConfig::default(), &StaticSecret("{}"), &mut env).await;
        assert!(added.is_empty());
    }
}
