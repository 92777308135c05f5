//! Leave request handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{LeaveFilter, LeaveReview, NewLeaveRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

/// Reviewers see every request, everyone else only their own
///
/// GET /api/v1/leave-requests
pub async fn list_leave_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(filter): ApiQuery<LeaveFilter>,
) -> ApiResult<impl IntoResponse> {
    let result = state.services.leave.list(&user, filter, *paging).await?;
    Ok(collection(result, "/leave-requests"))
}

/// GET /api/v1/leave-requests/:id
pub async fn get_leave_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.leave.get(&user, id).await?))
}

/// POST /api/v1/leave-requests
pub async fn submit_leave_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewLeaveRequest>,
) -> ApiResult<impl IntoResponse> {
    let request = state.services.leave.submit(&user, body).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// The body is optional: `{ "comment": "..." }`
///
/// POST /api/v1/leave-requests/:id/approve
pub async fn approve_leave_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    body: Option<ApiJson<LeaveReview>>,
) -> ApiResult<impl IntoResponse> {
    let review = body.map(|ApiJson(r)| r).unwrap_or_default();
    Ok(Json(state.services.leave.approve(&user, id, review).await?))
}

/// POST /api/v1/leave-requests/:id/reject
pub async fn reject_leave_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    body: Option<ApiJson<LeaveReview>>,
) -> ApiResult<impl IntoResponse> {
    let review = body.map(|ApiJson(r)| r).unwrap_or_default();
    Ok(Json(state.services.leave.reject(&user, id, review).await?))
}

/// POST /api/v1/leave-requests/:id/cancel
pub async fn cancel_leave_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.leave.cancel(&user, id).await?))
}
