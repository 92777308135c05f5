//! Attachment metadata model
//!
//! Table: attachments. The bytes live in file storage under `stored_name`.

use chrono::{DateTime, Utc};
use fo_core::traits::Id;
use serde::Serialize;
use sqlx::FromRow;

text_enum! {
    /// Kinds of records a file can be attached to
    pub enum AttachmentContainer {
        WorkOrder => "work_order",
        Employee => "employee",
        Client => "client",
        Resource => "resource",
        LeaveRequest => "leave_request",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Id,
    #[sqlx(try_from = "String")]
    pub container_type: AttachmentContainer,
    pub container_id: Id,
    /// Original file name as uploaded
    pub file_name: String,
    /// Storage key, unique
    #[serde(skip_serializing)]
    pub stored_name: String,
    pub content_type: String,
    pub size: i64,
    /// SHA-256, hex encoded
    pub digest: String,
    /// Relative URL the file is served from
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Uploader
    pub created_by_id: Option<Id>,
    pub updated_by_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl_entity!(Attachment, "attachments", "Attachment");

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub container_type: AttachmentContainer,
    pub container_id: Id,
    pub file_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size: i64,
    pub digest: String,
    pub url: String,
}
