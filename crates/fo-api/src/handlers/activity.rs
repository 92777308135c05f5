//! Activity log handlers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use fo_activity::{ClientErrorReport, RequestMeta};
use fo_auth::permissions::ACTIVITY_VIEW;
use fo_auth::RequestHeaders;
use fo_core::error::FoError;
use fo_models::ActivityFilter;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{require_permission, ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let pairs: Vec<(&str, &str)> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    let headers = RequestHeaders::from_pairs(&pairs);
    RequestMeta {
        ip_address: headers.client_ip(),
        user_agent: headers.user_agent,
    }
}

/// GET /api/v1/activity-logs
pub async fn list_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(filter): ApiQuery<ActivityFilter>,
) -> ApiResult<impl IntoResponse> {
    require_permission(&user, ACTIVITY_VIEW)?;
    let result = state
        .services
        .activity
        .search(&filter, *paging)
        .await
        .map_err(FoError::from)?;
    Ok(collection(result, "/activity-logs"))
}

/// Errors the browser application ran into
///
/// POST /api/v1/activity-logs/client-errors
pub async fn report_client_error(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    ApiJson(report): ApiJson<ClientErrorReport>,
) -> ApiResult<impl IntoResponse> {
    report
        .validate()
        .map_err(|e| ApiError::Validation(e.into()))?;
    state
        .services
        .activity
        .client_error(Some(user.id), report, request_meta(&headers))
        .await;
    Ok(StatusCode::ACCEPTED)
}
