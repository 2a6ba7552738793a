use crate::error::StorageError;
use crate::traits::ObjectStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory-backed object store. Keys are slash-separated relative paths
/// under the root; stands in for the cloud bucket the production system
/// talks to.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.contains('\\')
            || key
                .split('/')
                .any(|component| component.is_empty() || component == "." || component == "..")
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let mut path = self.root.clone();
        for component in key.split('/') {
            path.push(component);
        }
        Ok(path)
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::read(path).await?)
    }

    async fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|item| item.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(key) = self.relative_key(entry.path()) {
                if key.starts_with(prefix) && key.ends_with(suffix) {
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store.put("pdf/report.pdf", b"%PDF-1.4").await.unwrap();
        let bytes = store.get("pdf/report.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn listing_filters_by_prefix_and_suffix() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store.put("pdf/a.pdf", b"a").await.unwrap();
        store.put("pdf/notes.txt", b"n").await.unwrap();
        store.put("chunks/a.pdf-0.json", b"{}").await.unwrap();

        let mut keys = store.list_keys("pdf/", ".pdf").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["pdf/a.pdf"]);

        let chunk_keys = store.list_keys("chunks/", ".json").await.unwrap();
        assert_eq!(chunk_keys, vec!["chunks/a.pdf-0.json"]);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        for key in ["../escape", "a//b", "", "a/./b", "a\\b"] {
            let result = store.put(key, b"x").await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn listing_a_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path().join("nothing-here"));
        assert!(store.list_keys("pdf/", ".pdf").await.unwrap().is_empty());
    }
}
