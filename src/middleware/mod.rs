//! Custom middleware implementations for the API.
//!
//! From the outside in: correlation ID, request logging, metrics, error
//! envelope, CORS and JWT authentication are applied to the whole app; rate
//! limiting is applied per scope.

pub mod auth;
pub mod correlation;
pub mod cors;
pub mod error_envelope;
pub mod logging;
pub mod metrics;
pub mod rate_limit;

pub use auth::*;
pub use correlation::*;
pub use cors::*;
pub use error_envelope::*;
pub use logging::*;
pub use metrics::*;
pub use rate_limit::*;
