//! Response bodies shared across endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// State of one external dependency as seen by the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Up,
    Down,
    /// Not configured for this deployment.
    Disabled,
}

/// Readiness response listing every external dependency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: BTreeMap<String, DependencyStatus>,
}

impl ReadinessResponse {
    /// Ready unless a configured dependency is down.
    pub fn from_checks(checks: BTreeMap<String, DependencyStatus>) -> Self {
        let ready = checks.values().all(|s| *s != DependencyStatus::Down);
        Self {
            status: if ready { "ready" } else { "degraded" }.to_string(),
            checks,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

/// Uniform error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Machine readable category, e.g. `validation_error`.
    pub kind: String,
    pub message: String,
    /// Same value as the `X-Correlation-ID` response header.
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

/// Free-form JSON document, used for request and response bodies passed through
/// to a backend untouched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(value_type = Object)]
pub struct JsonDocument(pub Value);
