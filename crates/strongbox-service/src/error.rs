//! Top-level error type for the service binary and session setup.

use thiserror::Error;

use crate::{
    auth::LoginError, identity::IdentityError, objects::ObjectStoreError, sharing::SharingError,
    storage::StorageError,
};

/// Errors surfaced to the operator.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Invalid configuration or command-line input
    ///
    /// Fatal for the current command; fix the input and rerun.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local file I/O outside the stores (reading a file to send, writing a
    /// download)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata database could not be opened or used
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Blob store could not be opened or used
    #[error(transparent)]
    Objects(#[from] ObjectStoreError),

    /// Directory operation failed (registration, sign-in)
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Login refused
    #[error(transparent)]
    Login(#[from] LoginError),

    /// Send, list, or download failed
    #[error(transparent)]
    Sharing(#[from] SharingError),
}
