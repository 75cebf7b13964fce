//! Sign a development token accepted by the running service.

use std::{process::ExitCode, str::FromStr};

use chrono::{Duration, Utc};
use clap::Parser;
use jsonwebtoken::Algorithm;
use keel_api::{
    config::{Environment, Settings},
    services::issue_token,
};
use serde_json::{Map, Value, json};

/// `generate-jwt` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "generate-jwt",
    about = "Generate a signed JWT for calling protected endpoints",
    version
)]
struct CliArgs {
    /// Subject claim.
    #[arg(long, default_value = "user@example.com")]
    sub: String,
    /// Role claim.
    #[arg(long, default_value = "admin")]
    role: String,
    /// Lifetime in hours.
    #[arg(long, default_value_t = 1)]
    hours: i64,
    /// Signing secret or PEM key. Defaults to `JWT_SECRET`.
    #[arg(long)]
    secret: Option<String>,
    /// Signing algorithm. Defaults to `JWT_ALGORITHM`.
    #[arg(long, value_parser = parse_algorithm)]
    algorithm: Option<Algorithm>,
    /// Audience claim. Defaults to `JWT_AUDIENCE`.
    #[arg(long)]
    aud: Option<String>,
    /// Issuer claim. Defaults to `JWT_ISSUER`.
    #[arg(long)]
    iss: Option<String>,
    /// Print the claims to stderr.
    #[arg(long)]
    debug: bool,
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, String> {
    Algorithm::from_str(&raw.to_ascii_uppercase())
        .or_else(|_| Algorithm::from_str(raw))
        .map_err(|_| format!("unsupported algorithm `{raw}`"))
}

fn build_claims(args: &CliArgs, aud: Option<String>, iss: Option<String>) -> Map<String, Value> {
    let now = Utc::now();
    let expires = now + Duration::hours(args.hours);

    let mut claims = Map::new();
    claims.insert("sub".to_string(), json!(args.sub));
    claims.insert("role".to_string(), json!(args.role));
    claims.insert("iat".to_string(), json!(now.timestamp()));
    claims.insert("exp".to_string(), json!(expires.timestamp()));
    if let Some(aud) = aud {
        claims.insert("aud".to_string(), json!(aud));
    }
    if let Some(iss) = iss {
        claims.insert("iss".to_string(), json!(iss));
    }
    claims
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let settings = match Settings::parse(&Environment::capture()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("generate-jwt: {e}");
            return ExitCode::FAILURE;
        }
    };

    let secret = args.secret.clone().unwrap_or(settings.jwt.secret);
    let algorithm = args.algorithm.unwrap_or(settings.jwt.algorithm);
    let claims = build_claims(
        &args,
        args.aud.clone().or(settings.jwt.audience),
        args.iss.clone().or(settings.jwt.issuer),
    );

    if args.debug {
        eprintln!("algorithm: {algorithm:?}");
        eprintln!("{}", Value::Object(claims.clone()));
    }

    match issue_token(&claims, algorithm, &secret) {
        Ok(token) => {
            println!("{token}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("generate-jwt: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_optional_claims() {
        let args = CliArgs::parse_from(["generate-jwt", "--hours", "2"]);
        let claims = build_claims(&args, Some("keel".to_string()), None);

        assert_eq!(claims["sub"], "user@example.com");
        assert_eq!(claims["role"], "admin");
        assert_eq!(claims["aud"], "keel");
        assert!(!claims.contains_key("iss"));

        let lifetime = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
        assert_eq!(lifetime, 7200);
    }

    #[test]
    fn test_algorithm_parsing_is_case_insensitive() {
        assert_eq!(parse_algorithm("hs512").unwrap(), Algorithm::HS512);
        assert!(parse_algorithm("none").is_err());
    }
}
