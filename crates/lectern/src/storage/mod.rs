//! Blob storage for uploaded file bytes.

mod filesystem;

pub use filesystem::FsBlobStore;

use async_trait::async_trait;

use crate::error::StorageError;

/// Key/value store for file bytes. Keys are relative, `/`-separated paths
/// such as `ws-1/5f0c….pdf`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes a new blob. Fails with [`StorageError::FileExists`] rather
    /// than overwriting.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Reads a blob; `Ok(None)` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Removes a blob. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Builds the key for a new upload: `<workspace>/<uuid>.<ext>`.
pub fn new_blob_key(workspace_id: &str, extension: &str) -> String {
    let workspace: String = workspace_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let workspace = if workspace.is_empty() {
        "default".to_string()
    } else {
        workspace
    };
    format!("{}/{}.{}", workspace, uuid::Uuid::new_v4(), extension)
}
