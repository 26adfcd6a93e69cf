#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{ObjectStore, ObjectStoreError, validate_path};

/// In-memory blob store for testing.
///
/// Clones share the same blobs.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replace a blob's bytes in place (for corruption tests).
    pub fn overwrite(&self, path: &str, bytes: Vec<u8>) {
        self.lock().insert(path.to_string(), bytes);
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().expect("Mutex poisoned")
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        validate_path(path)?;

        let mut blobs = self.lock();
        if blobs.contains_key(path) {
            return Err(ObjectStoreError::AlreadyExists { path: path.to_string() });
        }
        blobs.insert(path.to_string(), bytes);

        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, ObjectStoreError> {
        validate_path(path)?;

        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound { path: path.to_string() })
    }

    async fn remove(&self, path: &str) -> Result<(), ObjectStoreError> {
        validate_path(path)?;

        self.lock().remove(path);
        Ok(())
    }
}
