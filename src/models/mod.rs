//! Data models for API requests and responses.
//!
//! This module contains all the data structures used for API communication,
//! including request/response models, request-scoped context and audit events.

pub mod api;
pub mod audit;
pub mod auth;
pub mod cache;
pub mod messages;
pub mod search;
pub mod user;

pub use api::*;
pub use audit::*;
pub use auth::*;
pub use cache::*;
pub use messages::*;
pub use search::*;
pub use user::*;
