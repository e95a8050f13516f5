//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::keys;
use async_trait::async_trait;
use fenestra_core::StorageBackend;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for fenestra_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => fenestra_core::AppError::NotFound(key),
            other => fenestra_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct Uploaded {
    /// Object key the file was stored under (leading slashes stripped)
    pub key: String,
    /// Public URL, built from the backend's base URL with each key segment
    /// percent-encoded independently
    pub url: String,
}

/// Storage abstraction trait
///
/// All storage backends (S3/R2, local filesystem) must implement this trait.
/// The ingestion orchestrator works against it so the pipeline can be tested
/// without a real bucket.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a local file to `key` and return the key plus its public URL.
    ///
    /// The file is read from disk and streamed to the backend; it is never
    /// loaded as a single allocation.
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<Uploaded>;

    /// Delete an object by key. Deleting a missing object is a success.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Base URL that public object URLs are built from (no trailing slash)
    fn public_base_url(&self) -> &str;

    /// Delete an object addressed either by its full public URL or by a bare
    /// key. The key is derived by stripping the public base URL and decoding
    /// percent-encoded segments.
    async fn delete_by_url(&self, url_or_key: &str) -> StorageResult<()> {
        let key = keys::key_from_url(self.public_base_url(), url_or_key);
        if key.is_empty() {
            return Err(StorageError::InvalidKey(url_or_key.to_string()));
        }
        self.delete(&key).await
    }
}
