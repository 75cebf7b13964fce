//! Correlation ID middleware.

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use std::{
    convert::Infallible,
    fmt,
    future::{Ready, ready},
    pin::Pin,
};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::error::UNKNOWN_CORRELATION_ID;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Correlation ID of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromRequest for CorrelationId {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(CorrelationId(correlation_id(req))))
    }
}

/// Correlation ID stored on `req`, or `-` when the middleware did not run.
pub fn correlation_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| UNKNOWN_CORRELATION_ID.to_string())
}

/// Correlation ID middleware factory
///
/// Reuses a non-empty `X-Correlation-ID` request header or generates a UUID v4,
/// runs the rest of the chain inside a `request` span carrying the ID and echoes
/// it on the response.
pub struct CorrelationIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for CorrelationIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CorrelationIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorrelationIdService { service }))
    }
}

pub struct CorrelationIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CorrelationIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let supplied = req
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let generated = supplied.is_none();
        let correlation_id = supplied.unwrap_or_else(|| Uuid::new_v4().to_string());
        req.extensions_mut()
            .insert(CorrelationId(correlation_id.clone()));

        let span = info_span!("request", correlation_id = %correlation_id);
        let fut = span.in_scope(|| {
            if generated {
                info!(path = %req.path(), "Generated correlation ID");
            } else {
                debug!(path = %req.path(), "Using supplied correlation ID");
            }
            self.service.call(req)
        });

        Box::pin(
            async move {
                let mut res = fut.await?;
                if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(CORRELATION_HEADER), value);
                }
                Ok(res)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};

    async fn echo(id: CorrelationId) -> HttpResponse {
        HttpResponse::Ok().body(id.to_string())
    }

    #[actix_web::test]
    async fn test_generates_id_when_missing() {
        let app = test::init_service(
            App::new()
                .wrap(CorrelationIdMiddleware)
                .route("/", web::get().to(echo)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let header = res
            .headers()
            .get(CORRELATION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = test::read_body(res).await;
        assert_eq!(body, header.as_bytes());
    }

    #[actix_web::test]
    async fn test_reuses_trimmed_supplied_id() {
        let app = test::init_service(
            App::new()
                .wrap(CorrelationIdMiddleware)
                .route("/", web::get().to(echo)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("X-Correlation-ID", "  trace-42 "))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get(CORRELATION_HEADER).unwrap(), "trace-42");

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("X-Correlation-ID", "   "))
            .to_request();
        let res = test::call_service(&app, req).await;
        let header = res.headers().get(CORRELATION_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(header).is_ok());
    }
}
