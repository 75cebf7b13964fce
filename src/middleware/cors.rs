//! Cross-origin resource sharing.
//!
//! Preflight requests are answered here, before authentication runs. Actual
//! cross-origin responses, including error envelopes, get the allow headers.

use actix_cors::Cors;

use crate::{
    config::AppConfig,
    error::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET},
    middleware::CORRELATION_HEADER,
};

/// Preflight cache lifetime in seconds.
const MAX_AGE: usize = 600;

/// Build the CORS policy for the configured origins.
///
/// With no origins configured every cross-origin preflight is refused.
pub fn cors_policy(config: &AppConfig) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .expose_headers([
            CORRELATION_HEADER,
            RATE_LIMIT_LIMIT,
            RATE_LIMIT_REMAINING,
            RATE_LIMIT_RESET,
        ])
        .supports_credentials()
        .max_age(MAX_AGE);

    if config.allows_any_origin() {
        return cors.allow_any_origin();
    }
    config
        .allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
