//! Service layer: adapters for external systems and request-independent logic.
//!
//! Each external system sits behind a small async trait so handlers and
//! middleware can be exercised with in-memory implementations.

pub mod cache;
pub mod database;
pub mod jwt;
pub mod metrics;
pub mod queue;
pub mod rate_limit;
pub mod search;
pub mod secrets;
pub mod state;

pub use cache::*;
pub use database::*;
pub use jwt::*;
pub use metrics::*;
pub use queue::*;
pub use rate_limit::*;
pub use search::*;
pub use secrets::*;
pub use state::*;
