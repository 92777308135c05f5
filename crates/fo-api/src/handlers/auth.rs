//! Authentication handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use fo_models::ChangePassword;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, AppState, AuthenticatedUser};
use crate::representers::{AccountResponse, TokenResponse};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Exchange credentials for a bearer token
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, current) = state
        .services
        .users
        .authenticate(&body.username, &body.password)
        .await?;
    let issued = state
        .auth
        .jwt()
        .issue(&current)
        .map_err(|e| ApiError::internal(format!("Could not sign token: {}", e)))?;

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_in: issued.expires_in,
        user: AccountResponse::new(user, &current),
    }))
}

/// The signed-in user with roles and permissions
///
/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<impl IntoResponse> {
    let account = state.services.users.get(&user, user.id).await?;
    Ok(Json(AccountResponse::new(account, &user)))
}

/// POST /api/v1/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<ChangePassword>,
) -> ApiResult<impl IntoResponse> {
    state.services.users.change_password(&user, body).await?;
    Ok(StatusCode::NO_CONTENT)
}
