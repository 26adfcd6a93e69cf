//! Storage error types.

use thiserror::Error;

/// Errors from metadata storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A record with this identifier already exists
    ///
    /// Raised by `insert_file_records`, which never overwrites. The whole
    /// batch is rejected.
    #[error("record {id} already exists")]
    Conflict {
        /// Identifier of the clashing record
        id: u64,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns true if retrying the same operation may succeed.
    ///
    /// Conflicts and corrupt values are permanent; I/O failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
