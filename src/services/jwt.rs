//! Bearer token parsing and JWT validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{config::JwtConfig, error::AuthError, models::Claims};

/// Key material that cannot be used with the configured algorithm.
#[derive(Debug, Error)]
pub enum JwtKeyError {
    #[error("invalid key material for {algorithm:?}: {source}")]
    InvalidKey {
        algorithm: Algorithm,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Family of key material an algorithm expects.
fn key_family(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => "hmac",
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => "rsa",
        Algorithm::ES256 | Algorithm::ES384 => "ec",
        Algorithm::EdDSA => "ed",
    }
}

/// Build the verification key: the shared secret for HS*, a PEM public key otherwise.
pub fn decoding_key(algorithm: Algorithm, material: &str) -> Result<DecodingKey, JwtKeyError> {
    let bytes = material.as_bytes();
    let key = match key_family(algorithm) {
        "hmac" => Ok(DecodingKey::from_secret(bytes)),
        "rsa" => DecodingKey::from_rsa_pem(bytes),
        "ec" => DecodingKey::from_ec_pem(bytes),
        _ => DecodingKey::from_ed_pem(bytes),
    };
    key.map_err(|source| JwtKeyError::InvalidKey { algorithm, source })
}

/// Build the signing key: the shared secret for HS*, a PEM private key otherwise.
pub fn encoding_key(algorithm: Algorithm, material: &str) -> Result<EncodingKey, JwtKeyError> {
    let bytes = material.as_bytes();
    let key = match key_family(algorithm) {
        "hmac" => Ok(EncodingKey::from_secret(bytes)),
        "rsa" => EncodingKey::from_rsa_pem(bytes),
        "ec" => EncodingKey::from_ec_pem(bytes),
        _ => EncodingKey::from_ed_pem(bytes),
    };
    key.map_err(|source| JwtKeyError::InvalidKey { algorithm, source })
}

/// Sign a claim set. Used by the `generate-jwt` tool and tests.
pub fn issue_token(
    claims: &Map<String, Value>,
    algorithm: Algorithm,
    material: &str,
) -> Result<String, JwtKeyError> {
    let key = encoding_key(algorithm, material)?;
    Ok(encode(&Header::new(algorithm), claims, &key)?)
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively and the token must be non-empty.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let (scheme, token) = value
        .split_once(char::is_whitespace)
        .ok_or(AuthError::InvalidHeaderFormat)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidHeaderFormat);
    }
    Ok(token)
}

/// Validates bearer tokens against the configured key, algorithm, audience and issuer.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(config: &JwtConfig) -> Result<Self, JwtKeyError> {
        let key = decoding_key(config.algorithm, &config.secret)?;

        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_nbf = true;
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }

    /// Check signature, expiry, audience and issuer, returning the claim set.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)?;
        Ok(Claims(data.claims))
    }
}
