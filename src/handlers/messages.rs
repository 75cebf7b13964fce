//! Message broker handlers.

use actix_web::web;
use serde_json::Value;
use tracing::info;

use crate::{
    error::ApiError,
    models::{
        ConsumeResponse, ConsumerStartedResponse, ErrorEnvelope, JsonDocument, PublishQuery,
        PublishResponse, QueueQuery,
    },
    services::AppState,
};

fn require_non_empty(location: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid_fields([(
            location.to_string(),
            "must not be empty".to_string(),
        )]));
    }
    Ok(())
}

/// Publish a JSON payload to a topic exchange
#[utoipa::path(
    post,
    path = "/messages/publish",
    params(PublishQuery),
    request_body(content = JsonDocument, description = "Message payload"),
    responses(
        (status = 200, description = "Message accepted by the broker", body = PublishResponse),
        (status = 503, description = "Broker unavailable", body = ErrorEnvelope)
    ),
    tag = "messages"
)]
pub async fn publish_message(
    state: web::Data<AppState>,
    query: web::Query<PublishQuery>,
    body: web::Json<Value>,
) -> Result<web::Json<PublishResponse>, ApiError> {
    let PublishQuery {
        exchange,
        routing_key,
    } = query.into_inner();
    require_non_empty("query.routing_key", &routing_key)?;

    state
        .broker()?
        .publish(&exchange, &routing_key, &body)
        .await?;

    info!(exchange = %exchange, routing_key = %routing_key, "Message published");
    Ok(web::Json(PublishResponse {
        status: "accepted".to_string(),
        exchange,
        routing_key,
    }))
}

/// Take one message from a queue
#[utoipa::path(
    post,
    path = "/messages/consume-once",
    params(QueueQuery),
    responses(
        (status = 200, description = "Message consumed and acknowledged", body = ConsumeResponse),
        (status = 404, description = "Queue is empty", body = ErrorEnvelope)
    ),
    tag = "messages"
)]
pub async fn consume_once(
    state: web::Data<AppState>,
    query: web::Query<QueueQuery>,
) -> Result<web::Json<ConsumeResponse>, ApiError> {
    require_non_empty("query.queue", &query.queue)?;

    match state.broker()?.consume_one(&query.queue).await? {
        Some(payload) => Ok(web::Json(ConsumeResponse { payload })),
        None => Err(ApiError::not_found("No messages available")),
    }
}

/// Start a background consumer on a queue
#[utoipa::path(
    post,
    path = "/messages/consume",
    params(QueueQuery),
    responses(
        (status = 200, description = "Consumer started", body = ConsumerStartedResponse),
        (status = 503, description = "Broker unavailable", body = ErrorEnvelope)
    ),
    tag = "messages"
)]
pub async fn start_consumer(
    state: web::Data<AppState>,
    query: web::Query<QueueQuery>,
) -> Result<web::Json<ConsumerStartedResponse>, ApiError> {
    let queue = query.into_inner().queue;
    require_non_empty("query.queue", &queue)?;

    state.broker()?.start_consumer(&queue).await?;
    Ok(web::Json(ConsumerStartedResponse {
        status: "consumer-started".to_string(),
        queue,
    }))
}
