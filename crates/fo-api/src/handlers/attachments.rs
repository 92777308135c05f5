//! Attachment handlers
//!
//! Uploads are `multipart/form-data` with the file in the `file` field.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fo_attachments::Upload;
use fo_core::traits::Id;
use fo_models::AttachmentContainer;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser};

const FILE_FIELD: &str = "file";

fn parse_container(container: &str) -> ApiResult<AttachmentContainer> {
    container
        .parse()
        .map_err(|_| ApiError::not_found("AttachmentContainer", container))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// GET /api/v1/attachments/:container_type/:container_id
pub async fn list_attachments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((container, container_id)): Path<(String, Id)>,
) -> ApiResult<impl IntoResponse> {
    let container = parse_container(&container)?;
    Ok(Json(
        state
            .services
            .attachments
            .list(&user, container, container_id)
            .await?,
    ))
}

/// POST /api/v1/attachments/:container_type/:container_id
pub async fn upload_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((container, container_id)): Path<(String, Id)>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let container = parse_container(&container)?;
    let max_size = state.config.storage.max_file_size;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > max_size {
            return Err(ApiError::payload_too_large(format!(
                "File is {} bytes, the limit is {} bytes",
                data.len(),
                max_size
            )));
        }
        upload = Some(Upload {
            file_name,
            content_type,
            data,
        });
        break;
    }
    let upload = upload.ok_or_else(|| ApiError::bad_request("Missing multipart field 'file'"))?;
    debug!(container = %container, container_id, size = upload.data.len(), "Receiving upload");

    let cancel = state.shutdown.child_token();
    let attachment = state
        .services
        .attachments
        .upload(&user, container, container_id, upload, &cancel)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

/// GET /api/v1/attachments/:id/content
pub async fn download_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<Response> {
    let (attachment, data) = state.services.attachments.download(&user, id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace(['"', '\\'], "_")
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, attachment.content_type)
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(data))
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// DELETE /api/v1/attachments/:id
pub async fn delete_attachment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    state.services.attachments.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
