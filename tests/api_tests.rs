mod common;

use std::{collections::BTreeMap, time::Duration};

use actix_web::{http::StatusCode, test};
use keel_api::{
    create_app,
    models::{
        CacheReadResponse, CacheWriteResponse, ConsumeResponse, DependencyStatus, ErrorEnvelope,
        HealthResponse, PublishResponse, ReadinessResponse, UserRead,
    },
    services::AppState,
};
use serde_json::{Value, json};

use common::*;

#[actix_web::test]
async fn test_health_needs_no_dependencies() {
    let components = components_with(&settings(), AppState::default(), None);
    let app = test::init_service(create_app(&components)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: HealthResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, "ok");
}

#[actix_web::test]
async fn test_readiness_reports_each_dependency() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;

    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: ReadinessResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, "ready");
    let expected: BTreeMap<String, DependencyStatus> = ["mysql", "opensearch", "rabbitmq", "redis"]
        .into_iter()
        .map(|name| (name.to_string(), DependencyStatus::Up))
        .collect();
    assert_eq!(body.checks, expected);
}

#[actix_web::test]
async fn test_readiness_fails_when_a_dependency_is_down() {
    let fakes = Fakes::new();
    let state = AppState::default()
        .with_users(fakes.users.clone())
        .with_cache(std::sync::Arc::new(MemoryCache::broken()));
    let components = components_with(&settings(), state, None);
    let app = test::init_service(create_app(&components)).await;

    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: ReadinessResponse = test::read_body_json(resp).await;
    assert_eq!(body.checks["redis"], DependencyStatus::Down);
    assert_eq!(body.checks["mysql"], DependencyStatus::Up);
    assert_eq!(body.checks["opensearch"], DependencyStatus::Disabled);
}

#[actix_web::test]
async fn test_user_lifecycle() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&token))
        .set_json(json!({"email": " ada@example.com ", "full_name": "Ada Lovelace"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: UserRead = test::read_body_json(resp).await;
    assert_eq!(created.email, "ada@example.com");

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", created.id))
        .insert_header(bearer(&token))
        .to_request();
    let fetched: UserRead = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, created);

    let req = test::TestRequest::get()
        .uri("/users?offset=0&limit=10")
        .insert_header(bearer(&token))
        .to_request();
    let listed: Vec<UserRead> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed, vec![created.clone()]);

    let req = test::TestRequest::delete()
        .uri(&format!("/users/{}", created.id))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", created.id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorEnvelope = test::read_body_json(resp).await;
    assert_eq!(body.message, "User not found");
}

#[actix_web::test]
async fn test_duplicate_email_conflicts() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();
    let payload = json!({"email": "grace@example.com", "full_name": "Grace Hopper"});

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&token))
        .set_json(&payload)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&token))
        .insert_header(("X-Correlation-ID", "dup"))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: ErrorEnvelope = test::read_body_json(resp).await;
    assert_eq!(body.kind, "conflict");
    assert_eq!(body.correlation_id, "dup");
}

#[actix_web::test]
async fn test_invalid_user_fields_are_listed() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;

    let req = test::TestRequest::post()
        .uri("/users")
        .insert_header(bearer(&token()))
        .set_json(json!({"email": "nope", "full_name": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorEnvelope = test::read_body_json(resp).await;
    let errors = body.details.unwrap()["errors"].as_array().unwrap().clone();
    assert_eq!(errors.len(), 2);

    let req = test::TestRequest::get()
        .uri("/users/not-a-number")
        .insert_header(bearer(&token()))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[actix_web::test]
async fn test_cache_round_trip_and_miss() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();

    let req = test::TestRequest::post()
        .uri("/cache/profile?ttl=30")
        .insert_header(bearer(&token))
        .set_json(json!({"theme": "dark"}))
        .to_request();
    let written: CacheWriteResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(written.status, "cached");
    assert_eq!(written.ttl, 30);
    assert_eq!(
        fakes.cache.ttls.lock().unwrap()["profile"],
        Duration::from_secs(30)
    );

    let req = test::TestRequest::get()
        .uri("/cache/profile")
        .insert_header(bearer(&token))
        .to_request();
    let read: CacheReadResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(read.value, json!({"theme": "dark"}));

    let req = test::TestRequest::get()
        .uri("/cache/absent")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorEnvelope = test::read_body_json(resp).await;
    assert_eq!(body.message, "Cache miss");
}

#[actix_web::test]
async fn test_cache_rejects_non_objects_and_zero_ttl() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();

    for (uri, body) in [
        ("/cache/k", json!([1, 2, 3])),
        ("/cache/k?ttl=0", json!({"a": 1})),
    ] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(bearer(&token))
            .set_json(body)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{uri}"
        );
    }
}

#[actix_web::test]
async fn test_search_index_get_and_query() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();

    let req = test::TestRequest::post()
        .uri("/search/books/1")
        .insert_header(bearer(&token))
        .set_json(json!({"title": "Dune"}))
        .to_request();
    let indexed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(indexed["result"], "created");

    let req = test::TestRequest::get()
        .uri("/search/books/1")
        .insert_header(bearer(&token))
        .to_request();
    let doc: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(doc["_source"]["title"], "Dune");

    let req = test::TestRequest::get()
        .uri("/search/books?q=Dune&size=5")
        .insert_header(bearer(&token))
        .to_request();
    let hits: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(hits["hits"]["total"]["value"], 1);

    let req = test::TestRequest::get()
        .uri("/search/books/404")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorEnvelope = test::read_body_json(resp).await;
    assert_eq!(body.message, "Document not found");
}

#[actix_web::test]
async fn test_publish_then_consume_once() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();

    let req = test::TestRequest::post()
        .uri("/messages/publish?exchange=events&routing_key=jobs")
        .insert_header(bearer(&token))
        .set_json(json!({"job": 7}))
        .to_request();
    let published: PublishResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(published.status, "accepted");
    assert_eq!(published.routing_key, "jobs");

    let req = test::TestRequest::post()
        .uri("/messages/consume-once?queue=jobs")
        .insert_header(bearer(&token))
        .to_request();
    let consumed: ConsumeResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(consumed.payload, json!({"job": 7}));

    let req = test::TestRequest::post()
        .uri("/messages/consume-once?queue=jobs")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorEnvelope = test::read_body_json(resp).await;
    assert_eq!(body.message, "No messages available");
}

#[actix_web::test]
async fn test_consumer_start_and_parameter_checks() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;
    let token = token();

    let req = test::TestRequest::post()
        .uri("/messages/consume?queue=audit")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(*fakes.broker.consumers.lock().unwrap(), vec!["audit".to_string()]);

    for uri in [
        "/messages/consume?queue=",
        "/messages/consume",
        "/messages/publish?exchange=events&routing_key=",
    ] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(bearer(&token))
            .set_json(json!({}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "{uri}"
        );
    }
}

#[actix_web::test]
async fn test_openapi_document_is_public() {
    let fakes = Fakes::new();
    let app = test::init_service(create_app(&components(&fakes))).await;

    let req = test::TestRequest::get().uri("/api-docs/openapi.json").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let doc: Value = test::read_body_json(resp).await;
    assert!(doc["paths"]["/users"].is_object());
    assert!(doc["components"]["securitySchemes"]["BearerAuth"].is_object());
}
