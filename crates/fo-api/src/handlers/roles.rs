//! Role and permission handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{NewRole, UpdateRole};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

/// GET /api/v1/roles
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
) -> ApiResult<impl IntoResponse> {
    let result = state.services.roles.list(&user, *paging).await?;
    Ok(collection(result, "/roles"))
}

/// GET /api/v1/roles/:id
pub async fn get_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.roles.get(&user, id).await?))
}

/// POST /api/v1/roles
pub async fn create_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewRole>,
) -> ApiResult<impl IntoResponse> {
    let role = state.services.roles.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// PATCH /api/v1/roles/:id
pub async fn update_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateRole>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.roles.update(&user, id, body).await?))
}

/// DELETE /api/v1/roles/:id
pub async fn delete_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.roles.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/permissions
pub async fn list_permissions(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.roles.permissions(&user).await?))
}
