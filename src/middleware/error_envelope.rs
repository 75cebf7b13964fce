//! Uniform JSON error responses.
//!
//! Every failure below this middleware is rendered as an [`ErrorEnvelope`]
//! carrying the request's correlation ID. That covers error responses from
//! inner middleware and handlers as well as error statuses produced without a
//! JSON body, such as unmatched routes. A bare `Err` from an inner service is
//! passed on with the envelope as its response.
//!
//! [`ErrorEnvelope`]: crate::models::ErrorEnvelope

use actix_web::{
    Error,
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    error::InternalError,
    http::{
        Method, StatusCode,
        header::{self, HeaderMap},
    },
    web,
};
use serde_json::Value;
use std::{
    future::{Ready, ready},
    pin::Pin,
};
use tracing::{error, warn};

use crate::{error::ApiError, middleware::correlation_id, utils::PiiScrubber};

/// Error envelope middleware factory
pub struct ErrorEnvelopeMiddleware;

impl<S, B> Transform<S, ServiceRequest> for ErrorEnvelopeMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = ErrorEnvelopeService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorEnvelopeService { service }))
    }
}

pub struct ErrorEnvelopeService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for ErrorEnvelopeService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Only owned request data may live across the inner call; routing needs
        // exclusive access to the request.
        let context = RequestContext::capture(&req);
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = match fut.await {
                Ok(res) => res,
                Err(err) => {
                    let api_error = ApiError::classify(&err);
                    context.log(&api_error);
                    let response = api_error.to_response(&context.correlation_id);
                    return Err(InternalError::from_response(err, response).into());
                }
            };

            let api_error = match res.response().error() {
                Some(err) => Some(ApiError::classify(err)),
                None if needs_envelope(res.status(), res.headers()) => {
                    Some(ApiError::from_status(res.status(), ""))
                }
                None => None,
            };

            match api_error {
                Some(api_error) => {
                    context.log(&api_error);
                    let (request, _) = res.into_parts();
                    let response = api_error.to_response(&context.correlation_id);
                    Ok(ServiceResponse::new(request, response))
                }
                None => Ok(res.map_into_boxed_body()),
            }
        })
    }
}

/// Error statuses whose body is not already JSON.
fn needs_envelope(status: StatusCode, headers: &HeaderMap) -> bool {
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    !is_json
}

struct RequestContext {
    correlation_id: String,
    method: Method,
    path: String,
    scrubber: Option<web::Data<PiiScrubber>>,
}

impl RequestContext {
    fn capture(req: &ServiceRequest) -> Self {
        Self {
            correlation_id: correlation_id(req.request()),
            method: req.method().clone(),
            path: req.path().to_string(),
            scrubber: req.app_data::<web::Data<PiiScrubber>>().cloned(),
        }
    }

    fn log(&self, api_error: &ApiError) {
        let details = match (api_error.details(), &self.scrubber) {
            (Some(details), Some(scrubber)) => scrubber.scrub(details),
            (Some(details), None) => details.clone(),
            (None, _) => Value::Null,
        };
        let status = api_error.status().as_u16();

        if api_error.status().is_server_error() {
            error!(
                correlation_id = %self.correlation_id,
                kind = api_error.kind(),
                status,
                method = %self.method,
                path = %self.path,
                error = %api_error,
                "Request failed"
            );
        } else {
            warn!(
                correlation_id = %self.correlation_id,
                kind = api_error.kind(),
                status,
                method = %self.method,
                path = %self.path,
                message = %api_error.public_message(),
                details = %details,
                "Request rejected"
            );
        }
    }
}
