//! Tracing subscriber setup.
//!
//! Events are written to stdout as JSON lines (see [`JsonLogFormat`]). The
//! filter comes from `RUST_LOG` when set, otherwise from `LOG_LEVEL`. Both the
//! level and the PII field list can be reapplied once the secrets bootstrap has
//! produced the final settings.

mod format;

pub use format::{CorrelationLayer, JsonLogFormat};

use std::sync::{Arc, RwLock};

use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::Layered, layer::SubscriberExt, reload,
    util::SubscriberInitExt,
};

use crate::{config::LoggingConfig, utils::PiiScrubber};

type FilterHandle = reload::Handle<EnvFilter, Layered<CorrelationLayer, Registry>>;

/// Handle to the installed subscriber.
#[derive(Clone)]
pub struct LoggingHandle {
    filter: FilterHandle,
    scrubber: Arc<RwLock<PiiScrubber>>,
    /// `RUST_LOG` was set and takes precedence over `LOG_LEVEL`.
    env_override: bool,
}

impl LoggingHandle {
    /// Apply a new level and PII field list to the running subscriber.
    pub fn apply(&self, config: &LoggingConfig) {
        let scrubber = PiiScrubber::new(&config.pii_fields);
        match self.scrubber.write() {
            Ok(mut guard) => *guard = scrubber,
            Err(poisoned) => *poisoned.into_inner() = scrubber,
        }

        if self.env_override {
            return;
        }
        match EnvFilter::try_new(&config.level) {
            Ok(filter) => {
                if let Err(e) = self.filter.reload(filter) {
                    tracing::warn!(error = %e, "Failed to reload log filter");
                }
            }
            Err(e) => {
                tracing::warn!(level = %config.level, error = %e, "Invalid LOG_LEVEL, keeping current filter");
            }
        }
    }

    /// Scrubber currently used by the log formatter.
    pub fn scrubber(&self) -> PiiScrubber {
        match self.scrubber.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn initial_filter(config: &LoggingConfig, env_override: bool) -> EnvFilter {
    let filter = if env_override {
        EnvFilter::try_from_default_env().ok()
    } else {
        EnvFilter::try_new(&config.level).ok()
    };
    filter.unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Calling this more than once leaves the first subscriber in place; the
/// returned handle then only drives the PII list of formatter instances it owns.
pub fn init_logging(config: &LoggingConfig) -> LoggingHandle {
    let env_override = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let scrubber = Arc::new(RwLock::new(PiiScrubber::new(&config.pii_fields)));

    // Per-layer filter so the correlation layer still sees spans below the
    // configured level.
    let (filter, filter_handle) = reload::Layer::new(initial_filter(config, env_override));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(JsonLogFormat::new(scrubber.clone()))
        .with_writer(std::io::stdout)
        .with_filter(filter);

    let installed = Registry::default()
        .with(CorrelationLayer)
        .with(fmt_layer)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(level = %config.level, env_override, "Logging initialized");
    }

    LoggingHandle {
        filter: filter_handle,
        scrubber,
        env_override,
    }
}
