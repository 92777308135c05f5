//! # fo-attachments
//!
//! File storage and attachment metadata for FieldOps.
//!
//! Uploaded files are written to a [`Storage`] backend (local disk or memory)
//! under `{container}/{yyyy}/{mm}/{uuid}.{ext}` and referenced by a relative
//! URL. Metadata is kept through an [`AttachmentStore`].

pub mod service;
pub mod storage;

pub use service::{
    AttachmentError, AttachmentPolicy, AttachmentResult, AttachmentService, AttachmentStore,
    MemoryAttachmentStore, Upload,
};
pub use storage::{
    generate_key, guess_content_type, sha256_hex, FileMetadata, LocalStorage, MemoryStorage,
    Storage, StorageError, StorageResult,
};
