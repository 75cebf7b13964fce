//! keel-api - a web service template built on Actix Web
//!
//! The service exposes small JSON APIs over four backends and carries the
//! cross-cutting concerns every service needs:
//! - correlation IDs on every request, response and log line
//! - structured JSON logging with PII redaction
//! - JWT bearer authentication with exempt paths
//! - Redis-backed fixed-window rate limiting
//! - one JSON error envelope for every failure
//! - Prometheus metrics and an OpenAPI document
//!
//! ## Architecture
//!
//! - `config/` - typed settings read from an environment snapshot
//! - `logging/` - subscriber setup and the JSON event formatter
//! - `middleware/` - correlation, logging, metrics, errors, auth, rate limits
//! - `handlers/` - HTTP handlers and the OpenAPI document
//! - `services/` - ports for MySQL, Redis, OpenSearch, RabbitMQ and the secret store
//! - `models/` - request, response and audit types
//! - `utils/` - request inspection, PII scrubbing, connection string helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use keel_api::{AppComponents, create_app, config::Settings, services::*, utils::PiiScrubber};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let components = AppComponents::new(
//!     &settings,
//!     AppState::default(),
//!     None,
//!     JwtVerifier::from_config(&settings.jwt)?,
//!     AppMetrics::new(&settings.app.name)?,
//!     PiiScrubber::default(),
//! );
//! let _app = create_app(&components);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use app::{AppComponents, create_app};
pub use config::{ConfigError, Environment, Settings};
pub use error::{ApiError, AuthError};
pub use logging::{LoggingHandle, init_logging};
pub use middleware::{CORRELATION_HEADER, CorrelationId};
pub use models::{Claims, ErrorEnvelope};
