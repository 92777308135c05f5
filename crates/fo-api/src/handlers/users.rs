//! User account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{NewUser, UpdateUser};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RolesRequest {
    pub roles: Vec<String>,
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .users
        .list(&user, query.q.as_deref(), *paging)
        .await?;
    Ok(collection(result, "/users"))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.users.get(&user, id).await?))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let created = state.services.users.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/v1/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.users.update(&user, id, body).await?))
}

/// Accounts are deactivated, never removed
///
/// DELETE /api/v1/users/:id
pub async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.users.deactivate(&user, id).await?))
}

/// PUT /api/v1/users/:id/roles
pub async fn set_user_roles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<RolesRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.users.set_roles(&user, id, body.roles).await?))
}
