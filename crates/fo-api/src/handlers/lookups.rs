//! Lookup handlers
//!
//! The kind is the path segment: `leave_type`, `leave_status`, `department`
//! or `resource_category`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{LookupKind, NewLookup, UpdateLookup};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
    pub is_active: Option<bool>,
}

fn parse_kind(kind: &str) -> ApiResult<LookupKind> {
    kind.parse()
        .map_err(|_| ApiError::not_found("LookupKind", kind))
}

/// GET /api/v1/lookups/:kind
pub async fn list_lookups(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(kind): Path<String>,
    ApiQuery(query): ApiQuery<LookupQuery>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    Ok(Json(
        state
            .services
            .lookups
            .list(&user, kind, query.include_inactive)
            .await?,
    ))
}

/// POST /api/v1/lookups/:kind
pub async fn create_lookup(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(kind): Path<String>,
    ApiJson(body): ApiJson<LookupRequest>,
) -> ApiResult<impl IntoResponse> {
    let input = NewLookup {
        kind: parse_kind(&kind)?,
        code: body.code,
        name: body.name,
        sort_order: body.sort_order,
        is_active: body.is_active.unwrap_or(true),
    };
    let lookup = state.services.lookups.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(lookup)))
}

/// PATCH /api/v1/lookups/:kind/:id
pub async fn update_lookup(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((kind, id)): Path<(String, Id)>,
    ApiJson(body): ApiJson<UpdateLookup>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.services.lookups.update(&user, kind, id, body).await?))
}

/// DELETE /api/v1/lookups/:kind/:id
pub async fn delete_lookup(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((kind, id)): Path<(String, Id)>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_kind(&kind)?;
    state.services.lookups.delete(&user, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
