//! Object storage for uploaded document bytes

pub mod local;
pub mod memory;

use async_trait::async_trait;
use axum::body::Bytes;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

/// MIME types accepted for uploads
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/jpg",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;
    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_CONTENT_TYPES.iter().any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

/// `documents/<siteId>/<uuid>-<file name>` with the file name reduced to a
/// safe character set
pub fn document_key(site_id: Uuid, document_id: Uuid, file_name: &str) -> String {
    format!("documents/{}/{}-{}", site_id, document_id, sanitize_file_name(file_name))
}

pub fn sanitize_file_name(file_name: &str) -> String {
    // Browsers may send a full client path
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.chars().take(128).collect()
    }
}

/// Lowercase hex sha256 of `bytes`
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Relative keys only; nothing that could climb out of the storage root
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
