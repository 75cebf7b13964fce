//! JSON cache handlers.

use std::time::Duration;

use actix_web::web;
use serde_json::Value;

use crate::{
    error::ApiError,
    models::{CacheReadResponse, CacheTtlQuery, CacheWriteResponse, ErrorEnvelope, JsonDocument},
    services::AppState,
};

/// Store a JSON object under `key`
#[utoipa::path(
    post,
    path = "/cache/{key}",
    params(("key" = String, Path, description = "Cache key"), CacheTtlQuery),
    request_body(content = JsonDocument, description = "Any JSON object"),
    responses(
        (status = 200, description = "Value cached", body = CacheWriteResponse),
        (status = 422, description = "Body is not a JSON object", body = ErrorEnvelope),
        (status = 503, description = "Cache unavailable", body = ErrorEnvelope)
    ),
    tag = "cache"
)]
pub async fn put_cache(
    state: web::Data<AppState>,
    key: web::Path<String>,
    query: web::Query<CacheTtlQuery>,
    body: web::Json<Value>,
) -> Result<web::Json<CacheWriteResponse>, ApiError> {
    let value = body.into_inner();
    if !value.is_object() {
        return Err(ApiError::invalid_fields([(
            "body".to_string(),
            "must be a JSON object".to_string(),
        )]));
    }
    let ttl = query.ttl();
    if ttl == 0 {
        return Err(ApiError::invalid_fields([(
            "query.ttl".to_string(),
            "must be greater than zero".to_string(),
        )]));
    }

    let key = key.into_inner();
    state
        .cache()?
        .set_json(&key, &value, Duration::from_secs(ttl))
        .await?;

    Ok(web::Json(CacheWriteResponse {
        status: "cached".to_string(),
        key,
        ttl,
    }))
}

/// Read the value stored under `key`
#[utoipa::path(
    get,
    path = "/cache/{key}",
    params(("key" = String, Path, description = "Cache key")),
    responses(
        (status = 200, description = "Cached value", body = CacheReadResponse),
        (status = 404, description = "Cache miss", body = ErrorEnvelope)
    ),
    tag = "cache"
)]
pub async fn get_cache(
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> Result<web::Json<CacheReadResponse>, ApiError> {
    let key = key.into_inner();
    match state.cache()?.get_json(&key).await? {
        Some(value) => Ok(web::Json(CacheReadResponse { key, value })),
        None => Err(ApiError::not_found("Cache miss")),
    }
}
