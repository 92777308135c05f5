//! Document template handlers

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{NewDocumentTemplate, UpdateDocumentTemplate};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

#[derive(Debug, Default, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    /// Fail instead of leaving unresolved placeholders in place
    #[serde(default)]
    pub strict: bool,
}

/// GET /api/v1/document-templates
pub async fn list_templates(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
) -> ApiResult<impl IntoResponse> {
    let result = state.services.templates.list(&user, *paging).await?;
    Ok(collection(result, "/document-templates"))
}

/// GET /api/v1/document-templates/:id
pub async fn get_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.templates.get(&user, id).await?))
}

/// POST /api/v1/document-templates
pub async fn create_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewDocumentTemplate>,
) -> ApiResult<impl IntoResponse> {
    let template = state.services.templates.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// PATCH /api/v1/document-templates/:id
pub async fn update_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateDocumentTemplate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.templates.update(&user, id, body).await?))
}

/// DELETE /api/v1/document-templates/:id
pub async fn delete_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.templates.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/document-templates/:id/render
pub async fn render_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<RenderRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .templates
            .render(&user, id, &body.values, body.strict)
            .await?,
    ))
}
