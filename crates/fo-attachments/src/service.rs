//! Attachment service
//!
//! Stores the bytes first, then the metadata. Deleting goes the other way
//! round: file first, then the record.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use fo_core::config::StorageConfig;
use fo_core::error::FoError;
use fo_core::traits::Id;
use fo_models::{Attachment, AttachmentContainer, NewAttachment};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::storage::{generate_key, guess_content_type, Storage, StorageError};

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment not found: {0}")]
    NotFound(Id),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },
    #[error("Content type not allowed: {0}")]
    InvalidContentType(String),
    #[error("Attachment store error: {0}")]
    Database(String),
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

impl From<AttachmentError> for FoError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound(id) => FoError::not_found("Attachment", id),
            AttachmentError::Storage(StorageError::NotFound(key)) => FoError::NotFound {
                entity: "File",
                field: "key",
                value: key,
            },
            AttachmentError::Storage(e) => FoError::Storage(e.to_string()),
            e @ AttachmentError::FileTooLarge { .. } => FoError::invalid("file", e.to_string()),
            AttachmentError::InvalidFile(message) => FoError::invalid("file", message),
            AttachmentError::InvalidContentType(ct) => {
                FoError::invalid("contentType", format!("{} is not allowed", ct))
            }
            AttachmentError::Database(message) => FoError::Database(message),
        }
    }
}

/// Attachment metadata persistence
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn create(&self, input: NewAttachment, actor: Option<Id>) -> AttachmentResult<Attachment>;

    /// Soft-deleted attachments are not returned
    async fn find_by_id(&self, id: Id) -> AttachmentResult<Option<Attachment>>;

    async fn list_for(&self, container: AttachmentContainer, container_id: Id) -> AttachmentResult<Vec<Attachment>>;

    async fn delete(&self, id: Id, actor: Option<Id>) -> AttachmentResult<()>;
}

/// In-memory attachment store
pub struct MemoryAttachmentStore {
    attachments: RwLock<BTreeMap<Id, Attachment>>,
    next_id: AtomicI64,
}

impl Default for MemoryAttachmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self {
            attachments: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn create(&self, input: NewAttachment, actor: Option<Id>) -> AttachmentResult<Attachment> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let attachment = Attachment {
            id,
            container_type: input.container_type,
            container_id: input.container_id,
            file_name: input.file_name,
            stored_name: input.stored_name,
            content_type: input.content_type,
            size: input.size,
            digest: input.digest,
            url: input.url,
            created_at: now,
            updated_at: now,
            created_by_id: actor,
            updated_by_id: actor,
            deleted_at: None,
        };
        self.attachments.write().await.insert(id, attachment.clone());
        Ok(attachment)
    }

    async fn find_by_id(&self, id: Id) -> AttachmentResult<Option<Attachment>> {
        Ok(self
            .attachments
            .read()
            .await
            .get(&id)
            .filter(|a| a.deleted_at.is_none())
            .cloned())
    }

    async fn list_for(&self, container: AttachmentContainer, container_id: Id) -> AttachmentResult<Vec<Attachment>> {
        Ok(self
            .attachments
            .read()
            .await
            .values()
            .filter(|a| {
                a.deleted_at.is_none() && a.container_type == container && a.container_id == container_id
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Id, actor: Option<Id>) -> AttachmentResult<()> {
        let mut attachments = self.attachments.write().await;
        match attachments.get_mut(&id).filter(|a| a.deleted_at.is_none()) {
            Some(attachment) => {
                let now = Utc::now();
                attachment.deleted_at = Some(now);
                attachment.updated_at = now;
                attachment.updated_by_id = actor;
                Ok(())
            }
            None => Err(AttachmentError::NotFound(id)),
        }
    }
}

/// Size and type limits for uploads
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub max_file_size: u64,
    pub blocked_content_types: Vec<String>,
    pub blocked_extensions: Vec<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for AttachmentPolicy {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_file_size: config.max_file_size as u64,
            blocked_content_types: config.blocked_content_types.clone(),
            blocked_extensions: config.blocked_extensions.clone(),
        }
    }
}

impl AttachmentPolicy {
    pub fn is_allowed(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        !self
            .blocked_content_types
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(essence))
    }

    pub fn is_allowed_name(&self, file_name: &str) -> bool {
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            return true;
        };
        !self
            .blocked_extensions
            .iter()
            .any(|blocked| blocked.trim_start_matches('.').eq_ignore_ascii_case(extension.trim()))
    }
}

/// One uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    /// As declared by the client; guessed from the name when missing
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Only the final path component of a client supplied name is kept
fn sanitize_file_name(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.chars().take(255).collect())
    }
}

pub struct AttachmentService {
    store: Arc<dyn AttachmentStore>,
    storage: Arc<dyn Storage>,
    policy: AttachmentPolicy,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn AttachmentStore>, storage: Arc<dyn Storage>, policy: AttachmentPolicy) -> Self {
        Self {
            store,
            storage,
            policy,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    #[instrument(skip(self, upload, cancel), fields(file_name = %upload.file_name, size = upload.data.len()))]
    pub async fn upload(
        &self,
        container: AttachmentContainer,
        container_id: Id,
        upload: Upload,
        actor: Option<Id>,
        cancel: &CancellationToken,
    ) -> AttachmentResult<Attachment> {
        let file_name = sanitize_file_name(&upload.file_name)
            .ok_or_else(|| AttachmentError::InvalidFile("file name is missing".to_string()))?;

        let size = upload.data.len() as u64;
        if size == 0 {
            return Err(AttachmentError::InvalidFile("file is empty".to_string()));
        }
        if size > self.policy.max_file_size {
            return Err(AttachmentError::FileTooLarge {
                size,
                max: self.policy.max_file_size,
            });
        }

        // The declared type is the client's word; the name decides as well
        let guessed = guess_content_type(&file_name);
        if !self.policy.is_allowed_name(&file_name) || !self.policy.is_allowed(&guessed) {
            return Err(AttachmentError::InvalidContentType(guessed));
        }
        let content_type = upload
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(guessed);
        if !self.policy.is_allowed(&content_type) {
            return Err(AttachmentError::InvalidContentType(content_type));
        }

        let key = generate_key(container, &file_name);
        let metadata = self.storage.put(&key, upload.data, cancel).await?;

        let input = NewAttachment {
            container_type: container,
            container_id,
            file_name,
            stored_name: key.clone(),
            content_type,
            size: metadata.size as i64,
            digest: metadata.digest,
            url: self.storage.url(&key),
        };

        match self.store.create(input, actor).await {
            Ok(attachment) => {
                info!(id = attachment.id, key = %key, storage = self.storage.name(), "Attachment stored");
                Ok(attachment)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Could not remove file after failed insert");
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: Id) -> AttachmentResult<Attachment> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AttachmentError::NotFound(id))
    }

    pub async fn list(&self, container: AttachmentContainer, container_id: Id) -> AttachmentResult<Vec<Attachment>> {
        self.store.list_for(container, container_id).await
    }

    pub async fn download(&self, id: Id) -> AttachmentResult<(Attachment, Bytes)> {
        let attachment = self.get(id).await?;
        let data = self.storage.get(&attachment.stored_name).await?;
        Ok((attachment, data))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Id, actor: Option<Id>) -> AttachmentResult<Attachment> {
        let attachment = self.get(id).await?;
        self.storage.delete(&attachment.stored_name).await?;
        self.store.delete(id, actor).await?;
        info!(id, "Attachment deleted");
        Ok(attachment)
    }
}
