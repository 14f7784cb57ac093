//! Object storage adapter for uploaded images, videos and PDFs.
//!
//! Objects are addressed by slash-separated keys such as
//! `blogs/image/3f2a...-cover.jpg`; the first segment is the collection's
//! folder.

pub mod local;
pub mod memory;

use async_trait::async_trait;

pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Public download URL for `key`.
    fn url(&self, key: &str) -> String;

    /// Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Keys of every object below the `prefix` folder.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Remove the `prefix` folder and anything left in it.
    async fn remove_folder(&self, prefix: &str) -> Result<(), StorageError>;
}

/// Reject keys that are empty, absolute or step outside their folder.
pub fn check_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

pub(crate) fn folder_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}
