//! HTTP request handlers for API endpoints.
//!
//! Handlers only translate between HTTP and the service ports in
//! [`AppState`](crate::services::AppState); every failure is an
//! [`ApiError`](crate::error::ApiError).

pub mod cache;
pub mod health;
pub mod messages;
pub mod metrics;
pub mod openapi;
pub mod search;
pub mod users;

pub use cache::*;
pub use health::*;
pub use messages::*;
pub use metrics::*;
pub use openapi::*;
pub use search::*;
pub use users::*;
