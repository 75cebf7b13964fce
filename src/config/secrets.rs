//! Secret store location.

use super::{ConfigError, Environment};

#[derive(Debug, Clone, Default)]
pub struct SecretsConfig {
    pub region: Option<String>,
    /// Name or ARN of the secret holding a flat JSON object of variables.
    pub secret_name: Option<String>,
}

impl SecretsConfig {
    pub fn from_env(env: &Environment) -> Result<Self, ConfigError> {
        Ok(Self {
            region: env.get_owned("AWS_REGION"),
            secret_name: env.get_owned("AWS_SECRETS_MANAGER_SECRET_NAME"),
        })
    }
}
