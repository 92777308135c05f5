//! Storage abstraction
//!
//! File bytes live in a storage backend under a generated key; metadata lives
//! in the attachment store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Datelike, Utc};
use fo_models::AttachmentContainer;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Write cancelled")]
    Cancelled,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What the backend learned while storing a file
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub content_type: String,
    /// SHA-256, hex encoded
    pub digest: String,
}

impl FileMetadata {
    fn describe(key: &str, data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            content_type: guess_content_type(key),
            digest: sha256_hex(data),
        }
    }
}

/// Unified interface for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key`. When `cancel` fires first nothing is left behind.
    async fn put(&self, key: &str, data: Bytes, cancel: &CancellationToken) -> StorageResult<FileMetadata>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Relative URL the file is served from
    fn url(&self, key: &str) -> String;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Local filesystem storage
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are relative and may not climb out of the root
    fn resolve_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.starts_with('/')
            || key.starts_with('\\')
            || Path::new(key).is_absolute()
        {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, data, cancel), fields(storage = "local", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, cancel: &CancellationToken) -> StorageResult<FileMetadata> {
        let path = self.resolve_path(key)?;
        self.ensure_parent(&path).await?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = Self::write_file(&path, &data) => Some(result),
        };

        match outcome {
            Some(Ok(())) => {
                debug!(path = ?path, "File stored");
                Ok(FileMetadata::describe(key, &data))
            }
            Some(Err(e)) => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    debug!(path = ?path, error = %cleanup, "Nothing to clean up after failed write");
                }
                Err(e.into())
            }
            None => {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    debug!(path = ?path, error = %cleanup, "No partial file to remove");
                }
                warn!(key, "Upload cancelled, partial file removed");
                Err(StorageError::Cancelled)
            }
        }
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.resolve_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, "File deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// In-memory storage for tests and the memory backend
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Bytes>>,
    base_url: String,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            base_url: "/uploads".to_string(),
        }
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes, cancel: &CancellationToken) -> StorageResult<FileMetadata> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let metadata = FileMetadata::describe(key, &data);
        self.files.write().await.insert(key.to_string(), data);
        Ok(metadata)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.files
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.files.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.files.read().await.contains_key(key))
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// `{container}/{yyyy}/{mm}/{uuid}.{ext}`
pub fn generate_key(container: AttachmentContainer, file_name: &str) -> String {
    let now = Utc::now();
    let ext = Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());
    let uuid = Uuid::new_v4();
    match ext {
        Some(ext) => format!("{}/{:04}/{:02}/{}.{}", container, now.year(), now.month(), uuid, ext),
        None => format!("{}/{:04}/{:02}/{}", container, now.year(), now.month(), uuid),
    }
}

pub fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalStorage {
        let dir = std::env::temp_dir().join(format!("fieldops-storage-{}", Uuid::new_v4()));
        LocalStorage::new(dir, "/uploads/")
    }

    #[tokio::test]
    async fn test_local_put_get_delete() {
        let storage = temp_storage();
        let token = CancellationToken::new();
        let key = "work_order/2024/05/report.txt";

        let meta = storage
            .put(key, Bytes::from("Hello, World!"), &token)
            .await
            .unwrap();
        assert_eq!(meta.size, 13);
        assert_eq!(meta.content_type, "text/plain");
        assert_eq!(meta.digest.len(), 64);

        assert_eq!(storage.get(key).await.unwrap(), Bytes::from("Hello, World!"));
        assert_eq!(storage.url(key), "/uploads/work_order/2024/05/report.txt");

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());
        storage.delete(key).await.unwrap();

        let _ = std::fs::remove_dir_all(storage.root());
    }

    #[tokio::test]
    async fn test_cancelled_put_leaves_nothing() {
        let storage = temp_storage();
        let token = CancellationToken::new();
        token.cancel();

        let result = storage
            .put("client/2024/05/big.bin", Bytes::from(vec![0u8; 1024]), &token)
            .await;
        assert!(matches!(result, Err(StorageError::Cancelled)));
        assert!(!storage.exists("client/2024/05/big.bin").await.unwrap());

        let _ = std::fs::remove_dir_all(storage.root());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let storage = temp_storage();
        for key in ["../../../etc/passwd", "/etc/passwd", ""] {
            let result = storage.get(key).await;
            assert!(matches!(result, Err(StorageError::InvalidPath(_))), "{key}");
        }
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        let token = CancellationToken::new();
        storage.put("a/b.txt", Bytes::from("x"), &token).await.unwrap();
        assert!(storage.exists("a/b.txt").await.unwrap());
        assert!(matches!(
            storage.get("missing").await,
            Err(StorageError::NotFound(_))
        ));

        token.cancel();
        assert!(storage.put("a/c.txt", Bytes::new(), &token).await.is_err());
        assert_eq!(storage.len().await, 1);
    }

    #[test]
    fn test_generate_key() {
        let key = generate_key(AttachmentContainer::WorkOrder, "Site Photo.JPG");
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "work_order");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 2);
        assert!(parts[3].ends_with(".jpg"));

        let no_ext = generate_key(AttachmentContainer::Client, "README");
        assert!(!no_ext.rsplit('/').next().unwrap().contains('.'));
    }
}
