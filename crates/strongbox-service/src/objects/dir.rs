//! Directory-backed blob store.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::io::AsyncWriteExt;

use super::{ObjectStore, ObjectStoreError, validate_path};

/// Blob store keeping one file per object under a root directory.
#[derive(Debug, Clone)]
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ObjectStoreError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| ObjectStoreError::Io(e.to_string()))?;

        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

impl ObjectStore for DirObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        let target = self.resolve(path)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    ObjectStoreError::AlreadyExists { path: path.to_string() }
                },
                _ => ObjectStoreError::Io(e.to_string()),
            })?;

        let written = async {
            file.write_all(&bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Leave no truncated blob behind
            let _ = tokio::fs::remove_file(&target).await;
            return Err(ObjectStoreError::Io(e.to_string()));
        }

        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let target = self.resolve(path)?;

        tokio::fs::read(&target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ObjectStoreError::NotFound { path: path.to_string() },
            _ => ObjectStoreError::Io(e.to_string()),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), ObjectStoreError> {
        let target = self.resolve(path)?;

        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ObjectStoreError::Io(e.to_string())),
        }
    }
}
