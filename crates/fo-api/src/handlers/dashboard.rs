//! Dashboard handler

use axum::{extract::State, response::IntoResponse, Json};

use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser};

/// GET /api/v1/dashboard/summary
pub async fn summary(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.dashboard.summary(&user).await?))
}
