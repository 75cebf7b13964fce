use std::{process::ExitCode, sync::Arc};

use actix_web::HttpServer;
use keel_api::{
    AppComponents, create_app,
    config::{ConfigError, Environment, Settings},
    init_logging,
    services::{
        AppMetrics, AwsSecretsManager, Backends, JwtKeyError, JwtVerifier, bootstrap_secrets,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("unusable JWT key material: {0}")]
    JwtKey(#[from] JwtKeyError),
    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("failed to bind {host}:{port}: {source}")]
    Bind {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[actix_web::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Startup failed");
            eprintln!("keel-api: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let mut env = Environment::capture();
    let settings = Settings::parse(&env)?;
    let logging = init_logging(&settings.logging);

    let added = if settings.secrets.secret_name.is_some() {
        let source = AwsSecretsManager::from_config(&settings.secrets).await;
        bootstrap_secrets(&settings.secrets, &source, &mut env).await
    } else {
        debug!("AWS_SECRETS_MANAGER_SECRET_NAME not set, skipping secrets bootstrap");
        Vec::new()
    };
    let settings = Settings::from_env(&env)?;
    if !added.is_empty() {
        logging.apply(&settings.logging);
    }

    info!(
        app = %settings.app.name,
        environment = %settings.app.environment,
        "Starting service"
    );
    if settings.jwt.uses_default_secret() {
        warn!("JWT_SECRET is the default value; set a real secret before deploying");
    }

    let verifier = JwtVerifier::from_config(&settings.jwt)?;
    let metrics = AppMetrics::new(&settings.app.name)?;
    let backends = Backends::connect(&settings, logging.scrubber()).await;

    let components = AppComponents::new(
        &settings,
        backends.state.clone(),
        backends.counters.clone(),
        verifier,
        metrics,
        logging.scrubber(),
    );
    if !components.limiter.is_active() {
        warn!(
            requests_per_minute = settings.rate_limit.requests_per_minute,
            "Rate limiting inactive: no counter store or zero threshold"
        );
    }

    let (host, port) = settings.app.bind_address();
    let factory_components = Arc::new(components);
    let mut server = HttpServer::new(move || create_app(&factory_components));
    if let Some(workers) = settings.app.workers {
        server = server.workers(workers);
    }
    let server = server
        .bind((host.as_str(), port))
        .map_err(|source| StartupError::Bind {
            host: host.clone(),
            port,
            source,
        })?;

    info!(host = %host, port, "Server listening");
    let result = server.run().await;

    backends.shutdown().await;
    info!("Server stopped");
    Ok(result?)
}
