//! # File Storage
//!
//! [`FileStorage`] keeps one file per key below a root directory. A key such as
//! `prefs/ada` becomes `<root>/prefs/ada.json`. Writes go to a temporary file
//! that is renamed over the target, so a reader never sees half a value.

use actor_runtime::{Storage, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StorageError::Backend(format!("invalid key: {key}")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

fn backend(key: &str, e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Backend(format!("{key}: {e}")),
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::Backend(format!("{key}: {e}")))?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| StorageError::Backend(format!("{key}: {e}")))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| StorageError::Backend(format!("{key}: {e}")))?;
        debug!(%key, bytes = bytes.len(), "Saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(key)?;
        tokio::fs::read(&path).await.map_err(|e| backend(key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_of(key)?;
        tokio::fs::remove_file(&path).await.map_err(|e| backend(key, e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_of(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::Backend(format!("{key}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("actor-hub-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn save_load_delete() {
        let root = scratch_dir("roundtrip");
        let storage = FileStorage::new(&root);
        assert_eq!(storage.root(), root.as_path());

        assert!(matches!(storage.load("prefs/ada").await, Err(StorageError::NotFound(_))));
        assert!(!storage.exists("prefs/ada").await.unwrap());

        storage.save("prefs/ada", b"{\"theme\":\"dark\"}").await.unwrap();
        assert!(root.join("prefs/ada.json").is_file());
        assert_eq!(storage.load("prefs/ada").await.unwrap(), b"{\"theme\":\"dark\"}");

        storage.save("prefs/ada", b"{}").await.unwrap();
        assert_eq!(storage.load("prefs/ada").await.unwrap(), b"{}");

        storage.delete("prefs/ada").await.unwrap();
        assert!(matches!(storage.delete("prefs/ada").await, Err(StorageError::NotFound(_))));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let storage = FileStorage::new(scratch_dir("escape"));
        for key in ["../outside", "/etc/passwd", "", "prefs/../../x"] {
            assert!(
                matches!(storage.save(key, b"x").await, Err(StorageError::Backend(_))),
                "{key}"
            );
        }
    }
}
