//! Object store backed by a local directory, served under a public base URL.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{check_key, ObjectStore, StorageError};

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, content_type, "stored object");
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let start = self.path_for(prefix.trim_end_matches('/'))?;
        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for(&path) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn remove_folder(&self, prefix: &str) -> Result<(), StorageError> {
        let path = self.path_for(prefix.trim_end_matches('/'))?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_lists_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3030/media/");

        store.put("photos/image/a.jpg", b"jpeg".to_vec(), "image/jpeg").await.unwrap();
        store.put("photos/image/b.jpg", b"jpeg".to_vec(), "image/jpeg").await.unwrap();

        assert_eq!(
            tokio::fs::read(dir.path().join("photos/image/a.jpg")).await.unwrap(),
            b"jpeg"
        );
        assert_eq!(
            store.list("photos").await.unwrap(),
            vec!["photos/image/a.jpg", "photos/image/b.jpg"]
        );
        assert_eq!(
            store.url("photos/image/a.jpg"),
            "http://localhost:3030/media/photos/image/a.jpg"
        );

        store.delete("photos/image/a.jpg").await.unwrap();
        store.delete("photos/image/a.jpg").await.unwrap();
        assert_eq!(store.list("photos").await.unwrap(), vec!["photos/image/b.jpg"]);

        store.remove_folder("photos").await.unwrap();
        assert!(!dir.path().join("photos").exists());
        assert!(store.list("photos").await.unwrap().is_empty());
        store.remove_folder("photos").await.unwrap();
    }

    #[tokio::test]
    async fn refuses_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://x");
        assert!(matches!(
            store.put("../escape.txt", vec![1], "text/plain").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
