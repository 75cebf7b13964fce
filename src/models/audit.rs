//! Security audit events for authentication and throttling decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of security events recorded by the middleware chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    TokenValidationSuccess,
    TokenValidationFailure,
    RateLimitExceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// Structured audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub outcome: AuditOutcome,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub subject: Option<String>,
    pub method: String,
    pub endpoint: String,
    pub correlation_id: Option<String>,
    pub reason: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        outcome: AuditOutcome,
        ip_address: String,
        method: String,
        endpoint: String,
    ) -> Self {
        Self {
            event_type,
            outcome,
            timestamp: Utc::now(),
            ip_address,
            user_agent: None,
            subject: None,
            method,
            endpoint,
            correlation_id: None,
            reason: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// JWT `sub` claim, when known.
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Emit the event on the `auth_audit` target. Failures are logged at warn.
    pub fn log(&self) {
        match self.outcome {
            AuditOutcome::Success => info!(
                target: "auth_audit",
                event_type = ?self.event_type,
                outcome = ?self.outcome,
                timestamp = %self.timestamp,
                ip_address = %self.ip_address,
                user_agent = ?self.user_agent,
                subject = ?self.subject,
                method = %self.method,
                endpoint = %self.endpoint,
                correlation_id = self.correlation_id.as_deref().unwrap_or("-"),
                "Security audit event"
            ),
            AuditOutcome::Failure => warn!(
                target: "auth_audit",
                event_type = ?self.event_type,
                outcome = ?self.outcome,
                timestamp = %self.timestamp,
                ip_address = %self.ip_address,
                user_agent = ?self.user_agent,
                subject = ?self.subject,
                method = %self.method,
                endpoint = %self.endpoint,
                correlation_id = self.correlation_id.as_deref().unwrap_or("-"),
                reason = ?self.reason,
                "Security audit event"
            ),
        }
    }
}
