//! Work order handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::pagination::SortParam;
use fo_core::traits::Id;
use fo_models::{NewResourceAssignment, NewWorkOrder, UpdateWorkOrder, WorkOrderFilter, WorkOrderStatus};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortQuery {
    /// `dueDate:desc,number`
    pub sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: WorkOrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub completion_percentage: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    /// `null` removes the assignee
    pub employee_id: Option<Id>,
}

/// GET /api/v1/work-orders
pub async fn list_work_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(filter): ApiQuery<WorkOrderFilter>,
    ApiQuery(sort): ApiQuery<SortQuery>,
) -> ApiResult<impl IntoResponse> {
    let sorts = sort.sort_by.as_deref().map(SortParam::parse).unwrap_or_default();
    let result = state
        .services
        .work_orders
        .search(&user, &filter, &sorts, *paging)
        .await?;
    Ok(collection(result, "/work-orders"))
}

/// GET /api/v1/work-orders/:id
pub async fn get_work_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.work_orders.get(&user, id).await?))
}

/// POST /api/v1/work-orders
pub async fn create_work_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewWorkOrder>,
) -> ApiResult<impl IntoResponse> {
    let order = state.services.work_orders.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// PATCH /api/v1/work-orders/:id
pub async fn update_work_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateWorkOrder>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.work_orders.update(&user, id, body).await?))
}

/// DELETE /api/v1/work-orders/:id
pub async fn delete_work_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.work_orders.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/work-orders/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .work_orders
            .change_status(&user, id, body.status)
            .await?,
    ))
}

/// PATCH /api/v1/work-orders/:id/progress
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<ProgressRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .work_orders
            .update_progress(&user, id, body.completion_percentage)
            .await?,
    ))
}

/// POST /api/v1/work-orders/:id/assign
pub async fn assign(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<AssignRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .work_orders
            .assign(&user, id, body.employee_id)
            .await?,
    ))
}

/// GET /api/v1/work-orders/:id/resources
pub async fn list_resources(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .resources
            .assignments_for_work_order(&user, id)
            .await?,
    ))
}

/// POST /api/v1/work-orders/:id/resources
pub async fn assign_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<NewResourceAssignment>,
) -> ApiResult<impl IntoResponse> {
    let assignment = state
        .services
        .resources
        .assign_to_work_order(&user, id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// POST /api/v1/work-orders/:id/resources/:assignment_id/release
pub async fn release_resource(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, assignment_id)): Path<(Id, Id)>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .resources
            .release(&user, id, assignment_id)
            .await?,
    ))
}
