//! Response shapes shared by several handlers

use axum::Json;
use fo_auth::CurrentUser;
use fo_core::pagination::{PaginatedResponse, PaginatedResult};
use fo_models::User;
use serde::Serialize;

/// Collection body with offset links back to `path`
pub fn collection<T: Serialize>(result: PaginatedResult<T>, path: &str) -> Json<PaginatedResponse<T>> {
    Json(PaginatedResponse::new(result, &format!("/api/v1{}", path)))
}

/// An account together with what it may do
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(flatten)]
    pub user: User,
    pub permissions: Vec<String>,
    pub is_admin: bool,
}

impl AccountResponse {
    pub fn new(user: User, current: &CurrentUser) -> Self {
        Self {
            user,
            permissions: current.permission_list(),
            is_admin: current.is_admin(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: AccountResponse,
}
