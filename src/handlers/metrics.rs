//! Metrics endpoint handler.

use crate::{config::MetricsConfig, error::ApiError, services::AppMetrics};
use actix_web::{HttpResponse, web};

/// Prometheus metrics endpoint
///
/// Returns the text exposition format. Scrapes of this route are not counted in
/// the request metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 503, description = "Metrics collection disabled")
    ),
    security(()),
    tag = "metrics"
)]
pub async fn get_metrics(
    config: web::Data<MetricsConfig>,
    metrics: web::Data<AppMetrics>,
) -> Result<HttpResponse, ApiError> {
    if !config.enabled {
        return Err(ApiError::ServiceUnavailable(
            "Metrics collection is disabled".to_string(),
        ));
    }

    metrics.update_uptime();
    let body = metrics
        .render()
        .map_err(|e| ApiError::internal(format!("failed to render metrics: {e}")))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(body))
}
