//! Rate limiting middleware.

use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
    web,
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
};
use tracing::warn;

use crate::{
    config::RateLimitKey,
    error::{ApiError, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET},
    middleware::correlation_id,
    models::{AuditEvent, AuditEventType, AuditOutcome, Claims},
    services::{AppMetrics, RateLimiter},
    utils::{extract_client_ip, extract_route_pattern, extract_user_agent},
};

/// Rate limit middleware factory
///
/// Counts requests per client and route pattern in the shared counter store.
/// Requests over the threshold fail with `429`; store failures let the request
/// through.
pub struct RateLimit {
    limiter: RateLimiter,
}

impl RateLimit {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
}

/// Client part of the counter key.
fn client_key(req: &ServiceRequest, strategy: RateLimitKey) -> String {
    if strategy == RateLimitKey::Subject
        && let Some(subject) = req
            .extensions()
            .get::<Claims>()
            .and_then(|claims| claims.subject().map(str::to_string))
    {
        return subject;
    }
    extract_client_ip(req.request())
}

fn audit_rejection(req: &ServiceRequest, client: &str) {
    AuditEvent::new(
        AuditEventType::RateLimitExceeded,
        AuditOutcome::Failure,
        extract_client_ip(req.request()),
        req.method().to_string(),
        req.path().to_string(),
    )
    .with_user_agent(extract_user_agent(req.request()))
    .with_subject(
        req.extensions()
            .get::<Claims>()
            .and_then(|c| c.subject().map(str::to_string)),
    )
    .with_correlation_id(Some(correlation_id(req.request())))
    .with_reason(format!("limit exceeded for {client}"))
    .log();
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            let route = extract_route_pattern(req.request());
            let client = client_key(&req, limiter.key_strategy());

            let decision = match limiter.check(&client, &route).await {
                Ok(Some(decision)) => decision,
                Ok(None) => return service.call(req).await.map(ServiceResponse::map_into_left_body),
                Err(e) => {
                    warn!(route = %route, error = %e, "Rate limit store unavailable, allowing request");
                    return service.call(req).await.map(ServiceResponse::map_into_left_body);
                }
            };

            if !decision.allowed {
                audit_rejection(&req, &client);
                if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
                    metrics.record_rate_limited(&route);
                }
                let error = ApiError::RateLimited {
                    limit: decision.limit,
                    retry_after: decision.reset_after,
                };
                return Ok(req.error_response(error).map_into_right_body());
            }

            let mut res = service.call(req).await?.map_into_left_body();
            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static(RATE_LIMIT_LIMIT),
                HeaderValue::from(decision.limit),
            );
            headers.insert(
                HeaderName::from_static(RATE_LIMIT_REMAINING),
                HeaderValue::from(decision.remaining),
            );
            headers.insert(
                HeaderName::from_static(RATE_LIMIT_RESET),
                HeaderValue::from(decision.reset_after),
            );
            Ok(res)
        })
    }
}
