//! Liveness and readiness probes.

use actix_web::{HttpResponse, web};

use crate::{
    models::{HealthResponse, ReadinessResponse},
    services::AppState,
};

/// Liveness probe
///
/// Answers as long as the process serves HTTP. Never touches a dependency.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = HealthResponse)),
    security(()),
    tag = "health"
)]
pub async fn health() -> web::Json<HealthResponse> {
    web::Json(HealthResponse::ok())
}

/// Readiness probe
///
/// Checks every configured dependency. Dependencies without a connection
/// string are reported as `disabled` and do not fail the probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "All configured dependencies are up", body = ReadinessResponse),
        (status = 503, description = "At least one dependency is down", body = ReadinessResponse)
    ),
    security(()),
    tag = "health"
)]
pub async fn ready(state: web::Data<AppState>) -> HttpResponse {
    let readiness = ReadinessResponse::from_checks(state.readiness().await);
    if readiness.is_ready() {
        HttpResponse::Ok().json(readiness)
    } else {
        HttpResponse::ServiceUnavailable().json(readiness)
    }
}
