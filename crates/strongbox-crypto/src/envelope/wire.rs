//! Persisted forms of envelope output
//!
//! Two shapes leave this crate:
//!
//! - The stored blob handed to object storage:
//!   - bytes 0-11: AES-GCM nonce
//!   - bytes 12..: ciphertext with trailing 16-byte tag
//! - The wrapped file key kept in the metadata row, as two base64 strings
//!   (wrapped key ciphertext+tag, wrap nonce) that always travel together.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::{
    error::CryptoError,
    keys::{NONCE_SIZE, TAG_SIZE},
};

/// A file's ciphertext with its detached nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFile {
    /// The 12-byte AES-GCM nonce
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext including 16-byte GCM tag
    pub ciphertext: Vec<u8>,
}

impl SealedFile {
    /// Smallest valid blob: a nonce plus the tag of an empty file.
    pub const MIN_BLOB_LEN: usize = NONCE_SIZE + TAG_SIZE;

    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }

    /// Serialize as `nonce || ciphertext` for object storage.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        blob.extend_from_slice(&self.nonce);
        blob.extend_from_slice(&self.ciphertext);
        blob
    }

    /// Split a stored blob back into nonce and ciphertext.
    ///
    /// # Errors
    ///
    /// - `BlobTooShort`: fewer than [`Self::MIN_BLOB_LEN`] bytes
    pub fn from_blob(blob: &[u8]) -> Result<Self, CryptoError> {
        if blob.len() < Self::MIN_BLOB_LEN {
            return Err(CryptoError::BlobTooShort {
                actual: blob.len(),
                minimum: Self::MIN_BLOB_LEN,
            });
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        Ok(Self { nonce: nonce_bytes, ciphertext: ciphertext.to_vec() })
    }
}

/// A file key wrapped under the master key, in transport encoding.
///
/// Both fields are standard (padded) base64 so they can sit in text columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Base64 of the wrapped key ciphertext including its tag
    pub wrapped_key: String,
    /// Base64 of the 12-byte wrap nonce
    pub wrap_nonce: String,
}

impl WrappedKey {
    /// Encode raw wrap output for storage.
    pub fn encode(ciphertext: &[u8], nonce: &[u8; NONCE_SIZE]) -> Self {
        Self { wrapped_key: STANDARD.encode(ciphertext), wrap_nonce: STANDARD.encode(nonce) }
    }

    /// Decode into raw wrapped bytes and the wrap nonce.
    ///
    /// # Errors
    ///
    /// - `Base64`: either field is not valid base64
    /// - `InvalidNonceLength`: the nonce does not decode to 12 bytes
    pub fn decode(&self) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CryptoError> {
        let ciphertext = STANDARD
            .decode(self.wrapped_key.as_bytes())
            .map_err(|e| CryptoError::Base64 { field: "wrapped_key", reason: e.to_string() })?;
        let nonce = STANDARD
            .decode(self.wrap_nonce.as_bytes())
            .map_err(|e| CryptoError::Base64 { field: "wrap_nonce", reason: e.to_string() })?;

        let nonce: [u8; NONCE_SIZE] = nonce.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidNonceLength { expected: NONCE_SIZE, actual: nonce.len() }
        })?;

        Ok((ciphertext, nonce))
    }
}
