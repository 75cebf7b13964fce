//! User CRUD handlers backed by the user repository.

use actix_web::{HttpResponse, web};
use tracing::info;

use crate::{
    error::ApiError,
    models::{ErrorEnvelope, UserCreate, UserListQuery, UserRead},
    services::AppState,
};

const USER_NOT_FOUND: &str = "User not found";

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserRead),
        (status = 409, description = "Email already registered", body = ErrorEnvelope),
        (status = 422, description = "Invalid payload", body = ErrorEnvelope),
        (status = 503, description = "Database unavailable", body = ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn create_user(
    state: web::Data<AppState>,
    payload: web::Json<UserCreate>,
) -> Result<HttpResponse, ApiError> {
    let user = payload.into_inner().validated()?;
    let created = state.users()?.create(&user).await?;

    info!(user_id = created.id, "User created");
    Ok(HttpResponse::Created().json(created))
}

/// List users ordered by id
#[utoipa::path(
    get,
    path = "/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Page of users", body = [UserRead]),
        (status = 503, description = "Database unavailable", body = ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<UserListQuery>,
) -> Result<web::Json<Vec<UserRead>>, ApiError> {
    let users = state
        .users()?
        .list(query.offset(), query.limit())
        .await?;
    Ok(web::Json(users))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserRead),
        (status = 404, description = "No such user", body = ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn get_user(
    state: web::Data<AppState>,
    user_id: web::Path<i64>,
) -> Result<web::Json<UserRead>, ApiError> {
    state
        .users()?
        .get(user_id.into_inner())
        .await?
        .map(web::Json)
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "No such user", body = ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn delete_user(
    state: web::Data<AppState>,
    user_id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user_id.into_inner();
    if !state.users()?.delete(user_id).await? {
        return Err(ApiError::not_found(USER_NOT_FOUND));
    }

    info!(user_id, "User deleted");
    Ok(HttpResponse::NoContent().finish())
}
