//! Utility functions and helpers.
//!
//! This module contains small helpers shared by middleware, handlers and
//! adapters.

pub mod http;
pub mod pii;
pub mod route;
pub mod dsn;

pub use http::*;
pub use pii::*;
pub use route::*;
pub use dsn::*;
