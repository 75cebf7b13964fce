//! HTTP-facing error types and the uniform JSON error envelope.
//!
//! Every error that reaches a client is rendered as
//! `{"kind", "message", "correlation_id", "details"?}`. Handlers and middleware
//! return [`ApiError`]; framework errors (payload, query, path extraction) are
//! classified into it by [`ApiError::classify`].

use actix_web::{
    HttpResponse, ResponseError,
    error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError},
    http::{
        StatusCode,
        header::{self, HeaderValue},
    },
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::ErrorEnvelope;

/// Correlation value used when an error is rendered outside a request context.
pub const UNKNOWN_CORRELATION_ID: &str = "-";

/// Bearer token failures.
///
/// The `Display` text is the internal reason used in logs and metrics. Clients only
/// ever see [`AuthError::public_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingHeader,
    #[error("authorization header is not a bearer credential")]
    InvalidHeaderFormat,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token algorithm is not accepted")]
    InvalidAlgorithm,
    #[error("token is missing required claim `{0}`")]
    MissingClaim(String),
    #[error("token is malformed")]
    Malformed,
    #[error("request carries no authenticated claims")]
    Unauthenticated,
}

impl AuthError {
    /// Message returned to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingHeader => "Missing authorization header",
            Self::InvalidHeaderFormat => "Invalid authorization header format",
            Self::Unauthenticated => "Not authenticated",
            _ => "Invalid or expired token",
        }
    }

    /// Stable label used in metrics and audit events.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidHeaderFormat => "invalid_header",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidAudience => "invalid_audience",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAlgorithm => "invalid_algorithm",
            Self::MissingClaim(_) => "missing_claim",
            Self::Malformed => "malformed",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAlgorithm => Self::InvalidAlgorithm,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::Malformed,
        }
    }
}

/// Error type returned by handlers and middleware.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("rate limit of {limit} requests exceeded, retry after {retry_after}s")]
    RateLimited { limit: u64, retry_after: u64 },
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure with one entry per offending field or location.
    pub fn invalid_fields<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let errors: Vec<Value> = errors
            .into_iter()
            .map(|(location, message)| json!({"location": location, "message": message}))
            .collect();
        Self::Validation {
            message: "Payload validation failed".to_string(),
            details: Some(json!({ "errors": errors })),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "authentication_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::Validation { .. } => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Upstream(_) => "upstream_error",
            Self::Http { .. } => "http_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Http { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Auth(err) => err.public_message().to_string(),
            Self::RateLimited { .. } => "Rate limit exceeded".to_string(),
            Self::Upstream(_) => "Upstream service error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Validation { message, .. } | Self::Http { message, .. } => message.clone(),
            Self::NotFound(message)
            | Self::Conflict(message)
            | Self::ServiceUnavailable(message) => message.clone(),
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn envelope(&self, correlation_id: &str) -> ErrorEnvelope {
        ErrorEnvelope {
            kind: self.kind().to_string(),
            message: self.public_message(),
            correlation_id: correlation_id.to_string(),
            details: self.details().cloned(),
        }
    }

    /// Build the full HTTP response for this error.
    pub fn to_response(&self, correlation_id: &str) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status());

        match self {
            Self::Auth(_) => {
                builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
            }
            Self::RateLimited { limit, retry_after } => {
                builder
                    .insert_header((header::RETRY_AFTER, retry_after.to_string()))
                    .insert_header((RATE_LIMIT_LIMIT, limit.to_string()))
                    .insert_header((RATE_LIMIT_REMAINING, HeaderValue::from_static("0")))
                    .insert_header((RATE_LIMIT_RESET, retry_after.to_string()));
            }
            _ => {}
        }

        builder.json(self.envelope(correlation_id))
    }

    /// Map any framework error onto the envelope taxonomy.
    pub fn classify(err: &actix_web::Error) -> Self {
        if let Some(api) = err.as_error::<ApiError>() {
            return api.clone();
        }
        if let Some(json) = err.as_error::<JsonPayloadError>() {
            return Self::from_json_error(json);
        }
        if let Some(query) = err.as_error::<QueryPayloadError>() {
            return Self::from_query_error(query);
        }
        if let Some(path) = err.as_error::<PathError>() {
            return Self::from_path_error(path);
        }
        if let Some(form) = err.as_error::<UrlencodedError>() {
            return Self::invalid_fields([("body".to_string(), form.to_string())]);
        }

        Self::from_status(err.as_response_error().status_code(), err.to_string())
    }

    /// Fallback classification for errors known only by their status code.
    pub fn from_status(status: StatusCode, detail: impl Into<String>) -> Self {
        let reason = status.canonical_reason().unwrap_or("Request failed");
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(reason.to_string()),
            StatusCode::UNAUTHORIZED => Self::Auth(AuthError::Unauthenticated),
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable(reason.to_string()),
            s if s.is_server_error() => Self::Internal(detail.into()),
            s => Self::Http {
                status: s.as_u16(),
                message: reason.to_string(),
            },
        }
    }

    pub fn from_json_error(err: &JsonPayloadError) -> Self {
        match err {
            JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                Self::Http {
                    status: StatusCode::PAYLOAD_TOO_LARGE.as_u16(),
                    message: "Payload too large".to_string(),
                }
            }
            JsonPayloadError::ContentType => Self::invalid_fields([(
                "body".to_string(),
                "expected an application/json body".to_string(),
            )]),
            JsonPayloadError::Deserialize(inner) => {
                Self::invalid_fields([("body".to_string(), inner.to_string())])
            }
            other => Self::invalid_fields([("body".to_string(), other.to_string())]),
        }
    }

    pub fn from_query_error(err: &QueryPayloadError) -> Self {
        Self::invalid_fields([("query".to_string(), err.to_string())])
    }

    pub fn from_path_error(err: &PathError) -> Self {
        Self::invalid_fields([("path".to_string(), err.to_string())])
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        self.to_response(UNKNOWN_CORRELATION_ID)
    }
}

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
