//! Messaging endpoint parameters and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublishQuery {
    /// Topic exchange, declared durable if missing.
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueueQuery {
    /// Queue name, declared durable if missing.
    pub queue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishResponse {
    pub status: String,
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsumeResponse {
    /// Decoded JSON, or the raw text when the body is not JSON.
    #[schema(value_type = Object)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConsumerStartedResponse {
    pub status: String,
    pub queue: String,
}
