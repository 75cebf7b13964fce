//! Shared handles to the external systems.
//!
//! Every adapter is optional. Handlers ask [`AppState`] for the port they need
//! and get a `503` envelope when it was never connected.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    config::Settings,
    error::ApiError,
    models::DependencyStatus,
    services::{
        AmqpBroker, CacheStore, CounterStore, MessageBroker, MySqlUserRepository,
        OpenSearchIndex, RedisCache, SearchIndex, UserRepository,
    },
    utils::{PiiScrubber, redact_credentials},
};

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Ports used by the request handlers.
#[derive(Clone, Default)]
pub struct AppState {
    users: Option<Arc<dyn UserRepository>>,
    cache: Option<Arc<dyn CacheStore>>,
    search: Option<Arc<dyn SearchIndex>>,
    broker: Option<Arc<dyn MessageBroker>>,
}

impl AppState {
    pub fn with_users(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchIndex>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_broker(mut self, broker: Arc<dyn MessageBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn users(&self) -> Result<&dyn UserRepository, ApiError> {
        self.users
            .as_deref()
            .ok_or_else(|| ApiError::ServiceUnavailable("Database connection unavailable".to_string()))
    }

    pub fn cache(&self) -> Result<&dyn CacheStore, ApiError> {
        self.cache
            .as_deref()
            .ok_or_else(|| ApiError::ServiceUnavailable("Cache unavailable".to_string()))
    }

    pub fn search(&self) -> Result<&dyn SearchIndex, ApiError> {
        self.search
            .as_deref()
            .ok_or_else(|| ApiError::ServiceUnavailable("Search service unavailable".to_string()))
    }

    pub fn broker(&self) -> Result<&dyn MessageBroker, ApiError> {
        self.broker
            .as_deref()
            .ok_or_else(|| ApiError::ServiceUnavailable("Message broker unavailable".to_string()))
    }

    /// Probe every configured dependency with a short timeout.
    pub async fn readiness(&self) -> BTreeMap<String, DependencyStatus> {
        let mut checks = BTreeMap::new();

        checks.insert(
            "mysql".to_string(),
            probe(self.users.as_deref().map(|u| async move { u.check().await.is_ok() })).await,
        );
        checks.insert(
            "redis".to_string(),
            probe(self.cache.as_deref().map(|c| async move { c.ping().await.is_ok() })).await,
        );
        checks.insert(
            "opensearch".to_string(),
            probe(
                self.search
                    .as_deref()
                    .map(|s| async move { s.cluster_health().await.is_ok() }),
            )
            .await,
        );
        checks.insert(
            "rabbitmq".to_string(),
            probe(self.broker.as_deref().map(|b| async move { b.check().await.is_ok() })).await,
        );

        checks
    }
}

async fn probe<F>(check: Option<F>) -> DependencyStatus
where
    F: Future<Output = bool>,
{
    let Some(check) = check else {
        return DependencyStatus::Disabled;
    };
    match tokio::time::timeout(CHECK_TIMEOUT, check).await {
        Ok(true) => DependencyStatus::Up,
        _ => DependencyStatus::Down,
    }
}

/// Connected adapters plus the concrete handles needed for shutdown.
#[derive(Default)]
pub struct Backends {
    pub state: AppState,
    pub counters: Option<Arc<dyn CounterStore>>,
    mysql: Option<MySqlUserRepository>,
    amqp: Option<Arc<AmqpBroker>>,
}

impl Backends {
    /// Connect every adapter that has a connection string.
    ///
    /// A failing adapter is logged and left out; the service still starts.
    pub async fn connect(settings: &Settings, scrubber: PiiScrubber) -> Self {
        let mut backends = Self::default();

        match settings.database.url.as_deref() {
            Some(url) => {
                let connected = match MySqlUserRepository::connect(url, settings.database.max_connections).await {
                    Ok(repo) => repo.ensure_schema().await.map(|_| repo),
                    Err(e) => Err(e),
                };
                match connected {
                    Ok(repo) => {
                        info!(url = %redact_credentials(url), "Connected to MySQL");
                        backends.state.users = Some(Arc::new(repo.clone()));
                        backends.mysql = Some(repo);
                    }
                    Err(e) => warn!(error = %e, "MySQL connection failed, continuing without database"),
                }
            }
            None => info!("MYSQL_DSN not set, database disabled"),
        }

        match settings.cache.url.as_deref() {
            Some(url) => match RedisCache::connect(url, settings.cache.pool_size).await {
                Ok(cache) => {
                    info!(url = %redact_credentials(url), "Connected to Redis");
                    let cache = Arc::new(cache);
                    backends.state.cache = Some(cache.clone());
                    backends.counters = Some(cache);
                }
                Err(e) => warn!(error = %e, "Redis connection failed, continuing without cache"),
            },
            None => info!("REDIS_URL not set, cache and rate limiting disabled"),
        }

        match settings.search.host.as_deref() {
            Some(host) => match OpenSearchIndex::connect(host, &settings.search) {
                Ok(index) => {
                    info!(host = %host, "Connected to OpenSearch");
                    backends.state.search = Some(Arc::new(index));
                }
                Err(e) => warn!(error = %e, "OpenSearch client setup failed, continuing without search"),
            },
            None => info!("OPENSEARCH_HOST not set, search disabled"),
        }

        match settings.queue.url.as_deref() {
            Some(url) => match AmqpBroker::connect(url, settings.queue.prefetch, scrubber).await {
                Ok(broker) => {
                    info!(url = %redact_credentials(url), "Connected to RabbitMQ");
                    let broker = Arc::new(broker);
                    backends.state.broker = Some(broker.clone());
                    backends.amqp = Some(broker);
                }
                Err(e) => warn!(error = %e, "RabbitMQ connection failed, continuing without messaging"),
            },
            None => info!("RABBITMQ_URL not set, messaging disabled"),
        }

        backends
    }

    pub async fn shutdown(&self) {
        if let Some(broker) = &self.amqp {
            if let Err(e) = broker.close().await {
                warn!(error = %e, "Failed to close RabbitMQ connection");
            }
        }
        if let Some(repo) = &self.mysql {
            repo.close().await;
        }
        info!("Backends closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_adapters_are_unavailable() {
        let state = AppState::default();

        let err = state.users().err().unwrap();
        assert_eq!(err.status().as_u16(), 503);
        assert_eq!(err.public_message(), "Database connection unavailable");
        assert!(state.cache().is_err());
        assert!(state.search().is_err());
        assert!(state.broker().is_err());
    }

    #[tokio::test]
    async fn test_readiness_reports_disabled_dependencies() {
        let checks = AppState::default().readiness().await;

        assert_eq!(checks.len(), 4);
        assert!(checks.values().all(|s| *s == DependencyStatus::Disabled));
    }
}
