//! Client, contact and material handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fo_core::traits::Id;
use fo_models::{
    NewClient, NewClientContact, NewClientMaterial, UpdateClient, UpdateClientContact, UpdateClientMaterial,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser, Paging};
use crate::representers::collection;

#[derive(Debug, Default, Deserialize)]
pub struct ClientQuery {
    pub q: Option<String>,
    pub active: Option<bool>,
}

/// GET /api/v1/clients
pub async fn list_clients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    ApiQuery(query): ApiQuery<ClientQuery>,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .clients
        .list(&user, query.q.as_deref(), query.active, *paging)
        .await?;
    Ok(collection(result, "/clients"))
}

/// GET /api/v1/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.clients.get(&user, id).await?))
}

/// POST /api/v1/clients
pub async fn create_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<NewClient>,
) -> ApiResult<impl IntoResponse> {
    let client = state.services.clients.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// PATCH /api/v1/clients/:id
pub async fn update_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateClient>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.clients.update(&user, id, body).await?))
}

/// DELETE /api/v1/clients/:id
pub async fn delete_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.clients.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/clients/:id/contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.clients.list_contacts(&user, id).await?))
}

/// POST /api/v1/clients/:id/contacts
pub async fn create_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<NewClientContact>,
) -> ApiResult<impl IntoResponse> {
    let contact = state.services.clients.create_contact(&user, id, body).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// PATCH /api/v1/clients/:id/contacts/:contact_id
pub async fn update_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, contact_id)): Path<(Id, Id)>,
    ApiJson(body): ApiJson<UpdateClientContact>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .services
            .clients
            .update_contact(&user, id, contact_id, body)
            .await?,
    ))
}

/// DELETE /api/v1/clients/:id/contacts/:contact_id
pub async fn delete_contact(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, contact_id)): Path<(Id, Id)>,
) -> ApiResult<impl IntoResponse> {
    state.services.clients.delete_contact(&user, id, contact_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/clients/:id/materials
pub async fn list_materials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    paging: Paging,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let result = state.services.materials.list_for_client(&user, id, *paging).await?;
    Ok(collection(result, &format!("/clients/{}/materials", id)))
}

/// POST /api/v1/clients/:id/materials
pub async fn create_material(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<NewClientMaterial>,
) -> ApiResult<impl IntoResponse> {
    let material = state.services.materials.create(&user, id, body).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// GET /api/v1/materials/:id
pub async fn get_material(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.materials.get(&user, id).await?))
}

/// PATCH /api/v1/materials/:id
pub async fn update_material(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
    ApiJson(body): ApiJson<UpdateClientMaterial>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.materials.update(&user, id, body).await?))
}

/// DELETE /api/v1/materials/:id
pub async fn delete_material(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.materials.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
