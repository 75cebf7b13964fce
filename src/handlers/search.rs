//! Search engine handlers. Engine responses are returned as-is.

use actix_web::web;
use serde_json::Value;

use crate::{
    error::ApiError,
    models::{ErrorEnvelope, JsonDocument, SearchQuery},
    services::AppState,
};

#[utoipa::path(
    post,
    path = "/search/{index}/{doc_id}",
    params(
        ("index" = String, Path, description = "Index name"),
        ("doc_id" = String, Path, description = "Document id")
    ),
    request_body(content = JsonDocument, description = "Document body"),
    responses(
        (status = 200, description = "Engine indexing response", body = JsonDocument),
        (status = 503, description = "Search unavailable", body = ErrorEnvelope)
    ),
    tag = "search"
)]
pub async fn index_document(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> Result<web::Json<Value>, ApiError> {
    let (index, doc_id) = path.into_inner();
    let document = body.into_inner();
    if !document.is_object() {
        return Err(ApiError::invalid_fields([(
            "body".to_string(),
            "must be a JSON object".to_string(),
        )]));
    }

    let response = state
        .search()?
        .index_document(&index, &doc_id, &document)
        .await?;
    Ok(web::Json(response))
}

#[utoipa::path(
    get,
    path = "/search/{index}/{doc_id}",
    params(
        ("index" = String, Path, description = "Index name"),
        ("doc_id" = String, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Engine document response", body = JsonDocument),
        (status = 404, description = "Document not found", body = ErrorEnvelope)
    ),
    tag = "search"
)]
pub async fn get_document(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<web::Json<Value>, ApiError> {
    let (index, doc_id) = path.into_inner();
    let document = state.search()?.get_document(&index, &doc_id).await?;
    Ok(web::Json(document))
}

/// Query an index
///
/// Without `q` every document matches.
#[utoipa::path(
    get,
    path = "/search/{index}",
    params(("index" = String, Path, description = "Index name"), SearchQuery),
    responses(
        (status = 200, description = "Engine search response", body = JsonDocument),
        (status = 404, description = "Index not found", body = ErrorEnvelope)
    ),
    tag = "search"
)]
pub async fn search_documents(
    state: web::Data<AppState>,
    index: web::Path<String>,
    query: web::Query<SearchQuery>,
) -> Result<web::Json<Value>, ApiError> {
    let hits = state
        .search()?
        .search(&index, query.query(), query.size())
        .await?;
    Ok(web::Json(hits))
}
