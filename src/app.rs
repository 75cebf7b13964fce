//! Application assembly: shared state, middleware stack and routes.

use std::sync::Arc;

use actix_web::{
    App, Error,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web,
};

use crate::{
    config::{AppConfig, MetricsConfig, Settings},
    error::ApiError,
    handlers,
    middleware::{
        CorrelationIdMiddleware, ErrorEnvelopeMiddleware, ExemptPaths, JwtAuth, MetricsMiddleware,
        RateLimit, RequestLogging, cors_policy,
    },
    services::{AppMetrics, AppState, CounterStore, JwtVerifier, RateLimiter},
    utils::PiiScrubber,
};

/// Everything the app factory needs, built once and cloned into each worker.
#[derive(Clone)]
pub struct AppComponents {
    pub app: Arc<AppConfig>,
    pub state: web::Data<AppState>,
    pub metrics: web::Data<AppMetrics>,
    pub metrics_config: web::Data<MetricsConfig>,
    pub scrubber: web::Data<PiiScrubber>,
    pub verifier: Arc<JwtVerifier>,
    pub exempt: ExemptPaths,
    pub limiter: RateLimiter,
}

impl AppComponents {
    pub fn new(
        settings: &Settings,
        state: AppState,
        counters: Option<Arc<dyn CounterStore>>,
        verifier: JwtVerifier,
        metrics: AppMetrics,
        scrubber: PiiScrubber,
    ) -> Self {
        Self {
            app: Arc::new(settings.app.clone()),
            state: web::Data::new(state),
            metrics: web::Data::new(metrics),
            metrics_config: web::Data::new(settings.metrics.clone()),
            scrubber: web::Data::new(scrubber),
            verifier: Arc::new(verifier),
            exempt: ExemptPaths::new(&settings.jwt.exempt_paths),
            limiter: RateLimiter::new(settings.rate_limit.clone(), counters),
        }
    }
}

/// Build the application.
///
/// Middleware runs outermost first: correlation ID, request logging,
/// metrics, error envelope, CORS, then JWT authentication. Rate limiting wraps
/// only the data scopes, so probes and docs are never throttled.
pub fn create_app(
    components: &AppComponents,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = Error,
        InitError = (),
    > + use<>,
> {
    let limiter = components.limiter.clone();

    App::new()
        .app_data(components.state.clone())
        .app_data(components.metrics.clone())
        .app_data(components.metrics_config.clone())
        .app_data(components.scrubber.clone())
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| ApiError::from_json_error(&err).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| ApiError::from_query_error(&err).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _req| ApiError::from_path_error(&err).into()),
        )
        .wrap(JwtAuth::new(
            components.verifier.clone(),
            components.exempt.clone(),
        ))
        .wrap(cors_policy(&components.app))
        .wrap(ErrorEnvelopeMiddleware)
        .wrap(MetricsMiddleware)
        .wrap(RequestLogging)
        .wrap(CorrelationIdMiddleware)
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(web::resource("/health/ready").route(web::get().to(handlers::ready)))
        .service(web::resource("/metrics").route(web::get().to(handlers::get_metrics)))
        .service(
            web::scope("/users")
                .wrap(RateLimit::new(limiter.clone()))
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::create_user))
                        .route(web::get().to(handlers::list_users)),
                )
                .service(
                    web::resource("/{user_id}")
                        .route(web::get().to(handlers::get_user))
                        .route(web::delete().to(handlers::delete_user)),
                ),
        )
        .service(
            web::scope("/cache")
                .wrap(RateLimit::new(limiter.clone()))
                .service(
                    web::resource("/{key}")
                        .route(web::post().to(handlers::put_cache))
                        .route(web::get().to(handlers::get_cache)),
                ),
        )
        .service(
            web::scope("/search")
                .wrap(RateLimit::new(limiter.clone()))
                .service(
                    web::resource("/{index}").route(web::get().to(handlers::search_documents)),
                )
                .service(
                    web::resource("/{index}/{doc_id}")
                        .route(web::post().to(handlers::index_document))
                        .route(web::get().to(handlers::get_document)),
                ),
        )
        .service(
            web::scope("/messages")
                .wrap(RateLimit::new(limiter))
                .service(
                    web::resource("/publish").route(web::post().to(handlers::publish_message)),
                )
                .service(
                    web::resource("/consume-once").route(web::post().to(handlers::consume_once)),
                )
                .service(
                    web::resource("/consume").route(web::post().to(handlers::start_consumer)),
                ),
        )
        .service(handlers::swagger_ui())
        .default_service(web::to(|| async {
            Err::<actix_web::HttpResponse, ApiError>(ApiError::not_found("Route not found"))
        }))
}
