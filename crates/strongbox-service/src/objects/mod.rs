//! Object storage for encrypted blobs
//!
//! Blobs are opaque: the store never sees plaintext or keys. Paths are flat
//! names (`<millis>_<file name>`); the store rejects anything that could
//! escape its root.

mod dir;
mod memory;

use std::future::Future;

pub use dir::DirObjectStore;
pub use memory::MemoryObjectStore;
use thiserror::Error;

/// Errors from object storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    /// No blob at this path
    #[error("object not found: {path}")]
    NotFound {
        /// Requested path
        path: String,
    },

    /// A blob already exists at this path
    #[error("object already exists: {path}")]
    AlreadyExists {
        /// Requested path
        path: String,
    },

    /// Path is empty, contains a separator, or is a relative component
    #[error("invalid object path {path:?}: {reason}")]
    InvalidPath {
        /// Rejected path
        path: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// I/O error from the backing store
    #[error("I/O error: {0}")]
    Io(String),
}

/// Async blob store.
///
/// Must be Clone (shared with the sharing service) and thread-safe. Uploads
/// never overwrite: a second upload to the same path fails.
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// Store `bytes` at `path`.
    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send;

    /// Fetch the blob at `path`.
    fn download(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ObjectStoreError>> + Send;

    /// Delete the blob at `path`.
    ///
    /// Idempotent: removing a missing blob succeeds.
    fn remove(&self, path: &str) -> impl Future<Output = Result<(), ObjectStoreError>> + Send;
}

/// Reject paths that are not a single plain component.
pub(crate) fn validate_path(path: &str) -> Result<(), ObjectStoreError> {
    let reason = if path.is_empty() {
        Some("empty")
    } else if path == "." || path == ".." {
        Some("relative component")
    } else if path.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if path.contains('\0') {
        Some("contains NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ObjectStoreError::InvalidPath { path: path.to_string(), reason }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_accepted() {
        assert!(validate_path("1700000000000_report.pdf").is_ok());
        assert!(validate_path("..hidden").is_ok());
    }

    #[test]
    fn traversal_rejected() {
        for path in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", "nul\0byte"] {
            assert!(
                matches!(validate_path(path), Err(ObjectStoreError::InvalidPath { .. })),
                "{path:?} should be rejected"
            );
        }
    }
}
