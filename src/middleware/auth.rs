//! Bearer token authentication middleware.

use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{Method, header},
    web,
};
use std::{
    collections::HashSet,
    future::{Ready, ready},
    pin::Pin,
    sync::Arc,
};

use crate::{
    error::{ApiError, AuthError},
    middleware::correlation_id,
    models::{AuditEvent, AuditEventType, AuditOutcome, Claims},
    services::{AppMetrics, JwtVerifier, bearer_token},
    utils::{extract_client_ip, extract_user_agent},
};

/// Documentation and static paths that never require a token.
const BUILTIN_EXEMPT: &[&str] = &["/favicon.ico", "/robots.txt", "/api-docs/openapi.json"];
const BUILTIN_EXEMPT_PREFIXES: &[&str] = &["/docs"];

/// Paths served without authentication.
#[derive(Debug, Clone, Default)]
pub struct ExemptPaths {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl ExemptPaths {
    /// Configured entries plus the built-in set. An entry ending in `*` is a prefix.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exempt = Self {
            exact: BUILTIN_EXEMPT.iter().map(|p| p.to_string()).collect(),
            prefixes: BUILTIN_EXEMPT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        };

        for path in paths {
            let path = path.as_ref().trim();
            match path.strip_suffix('*') {
                Some(prefix) if !prefix.is_empty() => exempt.prefixes.push(prefix.to_string()),
                Some(_) => {}
                None if !path.is_empty() => {
                    exempt.exact.insert(path.to_string());
                }
                None => {}
            }
        }

        exempt
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exact.contains(path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// JWT middleware factory
///
/// Non-exempt requests must carry `Authorization: Bearer <token>`. Valid claims
/// are stored as a [`Claims`] request extension; failures short-circuit with a
/// `401` response carrying the [`ApiError`].
#[derive(Clone)]
pub struct JwtAuth {
    verifier: Arc<JwtVerifier>,
    exempt: Arc<ExemptPaths>,
}

impl JwtAuth {
    pub fn new(verifier: Arc<JwtVerifier>, exempt: ExemptPaths) -> Self {
        Self {
            verifier,
            exempt: Arc::new(exempt),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthService {
            service,
            verifier: self.verifier.clone(),
            exempt: self.exempt.clone(),
        }))
    }
}

pub struct JwtAuthService<S> {
    service: S,
    verifier: Arc<JwtVerifier>,
    exempt: Arc<ExemptPaths>,
}

impl<S> JwtAuthService<S> {
    fn authenticate(&self, req: &ServiceRequest) -> Result<Claims, AuthError> {
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::InvalidHeaderFormat))
            .transpose()?;
        let token = bearer_token(header)?;
        self.verifier.verify(token)
    }
}

fn audit(req: &ServiceRequest, outcome: Result<&Claims, &AuthError>) {
    let (event_type, result) = match outcome {
        Ok(_) => (AuditEventType::TokenValidationSuccess, AuditOutcome::Success),
        Err(_) => (AuditEventType::TokenValidationFailure, AuditOutcome::Failure),
    };

    let mut event = AuditEvent::new(
        event_type,
        result,
        extract_client_ip(req.request()),
        req.method().to_string(),
        req.path().to_string(),
    )
    .with_user_agent(extract_user_agent(req.request()))
    .with_correlation_id(Some(correlation_id(req.request())));

    event = match outcome {
        Ok(claims) => event.with_subject(claims.subject().map(str::to_string)),
        Err(err) => event.with_reason(err.reason()),
    };
    event.log();
}

impl<S, B> Service<ServiceRequest> for JwtAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let exempt = req.method() == Method::OPTIONS || self.exempt.is_exempt(req.path());

        if !exempt {
            match self.authenticate(&req) {
                Ok(claims) => {
                    audit(&req, Ok(&claims));
                    req.extensions_mut().insert(claims);
                }
                Err(err) => {
                    audit(&req, Err(&err));
                    if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
                        metrics.record_auth_failure(err.reason());
                    }
                    let res = req.error_response(ApiError::Auth(err)).map_into_right_body();
                    return Box::pin(async move { Ok(res) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_and_configured_exemptions() {
        let exempt = ExemptPaths::new(["/health", "/public/*", " "]);

        assert!(exempt.is_exempt("/health"));
        assert!(!exempt.is_exempt("/health/extra"));
        assert!(exempt.is_exempt("/public/logo.png"));
        assert!(exempt.is_exempt("/docs/index.html"));
        assert!(exempt.is_exempt("/api-docs/openapi.json"));
        assert!(exempt.is_exempt("/favicon.ico"));
        assert!(!exempt.is_exempt("/users"));
    }

    #[test]
    fn test_lone_wildcard_is_ignored() {
        let exempt = ExemptPaths::new(["*"]);
        assert!(!exempt.is_exempt("/users"));
    }
}
