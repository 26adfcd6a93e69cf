//! Key types for the two envelope layers
//!
//! Both keys zeroize on drop and print redacted. Neither type implements
//! `Clone`: the master key is shared by reference counting in the session
//! layer, and a file key lives for exactly one encrypt or decrypt call.

use std::fmt;

use zeroize::Zeroize;

use super::error::CryptoError;

/// AES-256 key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size (96 bits)
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Session-lifetime key derived from the operator passphrase.
///
/// Only used to wrap and unwrap file keys. The raw bytes are not reachable
/// outside this crate, so the key cannot be exported or persisted.
pub struct MasterKey {
    key: [u8; KEY_SIZE],
}

impl MasterKey {
    pub(crate) fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    pub(crate) fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// One-time key encrypting a single file's bytes.
///
/// Created from fresh random bytes for every upload, or recovered by
/// unwrapping stored metadata for a download.
pub struct FileKey {
    key: [u8; KEY_SIZE],
}

impl FileKey {
    /// Build a file key from caller-provided random bytes.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production and MUST NOT reuse them for another file.
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Import raw key bytes recovered from an unwrap.
    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() })?;
        Ok(Self { key })
    }

    pub(crate) fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileKey(<redacted>)")
    }
}
