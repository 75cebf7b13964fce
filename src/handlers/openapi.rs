//! OpenAPI document and Swagger UI.

use utoipa::{
    Modify, OpenApi,
    openapi::{
        Components,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_swagger_ui::SwaggerUi;

use crate::models::{
    CacheReadResponse, CacheWriteResponse, ConsumeResponse, ConsumerStartedResponse,
    DependencyStatus, ErrorEnvelope, HealthResponse, JsonDocument, PublishResponse,
    ReadinessResponse, UserCreate, UserRead,
};

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Registers the bearer JWT scheme referenced by every secured operation.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::default);

        components.add_security_scheme(
            "BearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token signed with JWT_SECRET, see `generate-jwt`."))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "keel-api",
        description = "Web service template: users, cache, search and messaging over MySQL, Redis, OpenSearch and RabbitMQ. Every error uses the same JSON envelope and carries the request's correlation ID."
    ),
    security(("BearerAuth" = [])),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::metrics::get_metrics,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::delete_user,
        crate::handlers::cache::put_cache,
        crate::handlers::cache::get_cache,
        crate::handlers::search::index_document,
        crate::handlers::search::get_document,
        crate::handlers::search::search_documents,
        crate::handlers::messages::publish_message,
        crate::handlers::messages::consume_once,
        crate::handlers::messages::start_consumer,
    ),
    components(schemas(
        HealthResponse,
        ReadinessResponse,
        DependencyStatus,
        ErrorEnvelope,
        JsonDocument,
        UserCreate,
        UserRead,
        CacheWriteResponse,
        CacheReadResponse,
        PublishResponse,
        ConsumeResponse,
        ConsumerStartedResponse,
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "metrics", description = "Prometheus scrape endpoint"),
        (name = "users", description = "User records in MySQL"),
        (name = "cache", description = "JSON values in Redis"),
        (name = "search", description = "Documents in OpenSearch"),
        (name = "messages", description = "Messages over RabbitMQ")
    )
)]
pub struct ApiDoc;

/// Swagger UI under `/docs/`, serving the document at [`OPENAPI_JSON_PATH`].
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs/{_:.*}").url(OPENAPI_JSON_PATH, ApiDoc::openapi())
}
