//! Resource handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{NewResource, ResourceFilter, ResourceStatus, UpdateResource};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

#[derive(Debug, Deserialize)]
pub struct ResourceStatusRequest {
    pub status: ResourceStatus,
}

/// GET /api/v1/resources
pub async fn list_resources(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(filter): ApiQuery<ResourceFilter>,
) -> ApiResult<impl IntoResponse> {
    let result = state.services.resources.list(&user, &filter, *paging).await?;
    Ok(collection(result, "/resources"))
}

/// GET /api/v1/resources/:id
pub async fn get_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.resources.get(&user, id).await?))
}

/// POST /api/v1/resources
pub async fn create_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewResource>,
) -> ApiResult<impl IntoResponse> {
    let resource = state.services.resources.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

/// PATCH /api/v1/resources/:id
pub async fn update_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateResource>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.resources.update(&user, id, body).await?))
}

/// DELETE /api/v1/resources/:id
pub async fn delete_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.resources.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resources/:id/status
pub async fn set_resource_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<ResourceStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .resources
            .set_status(&user, id, body.status)
            .await?,
    ))
}
