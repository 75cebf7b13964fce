//! User resource payloads.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;

pub const EMAIL_MAX_LEN: usize = 320;
pub const FULL_NAME_MAX_LEN: usize = 200;
pub const LIST_DEFAULT_LIMIT: u32 = 100;
pub const LIST_MAX_LIMIT: u32 = 1000;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

fn looks_like_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// Body of `POST /users`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub full_name: String,
}

impl UserCreate {
    /// Trim and check the payload, collecting every field error.
    pub fn validated(self) -> Result<Self, ApiError> {
        let email = self.email.trim().to_string();
        let full_name = self.full_name.trim().to_string();
        let mut errors = Vec::new();

        if email.len() > EMAIL_MAX_LEN || !looks_like_email(&email) {
            errors.push((
                "body.email".to_string(),
                "value is not a valid email address".to_string(),
            ));
        }
        if full_name.is_empty() {
            errors.push(("body.full_name".to_string(), "must not be empty".to_string()));
        } else if full_name.chars().count() > FULL_NAME_MAX_LEN {
            errors.push((
                "body.full_name".to_string(),
                format!("must be at most {FULL_NAME_MAX_LEN} characters"),
            ));
        }

        if errors.is_empty() {
            Ok(Self { email, full_name })
        } else {
            Err(ApiError::invalid_fields(errors))
        }
    }
}

/// Stored user as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct UserRead {
    pub id: i64,
    pub email: String,
    pub full_name: String,
}

/// Pagination for `GET /users`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Rows to skip, default 0.
    pub offset: Option<u32>,
    /// Maximum rows returned, default 100, capped at 1000.
    pub limit: Option<u32>,
}

impl UserListQuery {
    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(LIST_DEFAULT_LIMIT).clamp(1, LIST_MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(email: &str, full_name: &str) -> UserCreate {
        UserCreate {
            email: email.to_string(),
            full_name: full_name.to_string(),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("ada example@mail.com"));
        assert!(!looks_like_email("@example.com"));
    }

    #[test]
    fn test_valid_payload_is_trimmed() {
        let user = payload("  ada@example.com ", " Ada Lovelace ")
            .validated()
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.full_name, "Ada Lovelace");
    }

    #[test]
    fn test_invalid_fields_are_all_reported() {
        let err = payload("not-an-email", "   ").validated().unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let errors = err.details().unwrap()["errors"].as_array().unwrap().clone();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["location"], "body.email");
        assert_eq!(errors[1]["location"], "body.full_name");
    }

    #[test]
    fn test_full_name_length_limit() {
        let long_name = "x".repeat(FULL_NAME_MAX_LEN + 1);
        assert!(payload("ada@example.com", &long_name).validated().is_err());
    }

    #[test]
    fn test_list_query_limits() {
        let query = UserListQuery {
            offset: None,
            limit: Some(5000),
        };
        assert_eq!(query.offset(), 0);
        assert_eq!(query.limit(), LIST_MAX_LIMIT);
        assert_eq!(UserListQuery::default().limit(), LIST_DEFAULT_LIMIT);
    }
}
