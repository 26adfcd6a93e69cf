//! Error types for envelope operations

use thiserror::Error;

/// Errors from envelope primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// AEAD encryption failed
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// Reason reported by the primitive
        reason: String,
    },

    /// Authentication tag did not verify.
    ///
    /// Either the key is wrong (wrong passphrase) or the ciphertext, nonce,
    /// or wrapped key was modified.
    #[error("authentication failed: wrong key or corrupted data")]
    AuthenticationFailed,

    /// Invalid key material length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// Invalid nonce length
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length
        expected: usize,
        /// Actual nonce length
        actual: usize,
    },

    /// Stored blob cannot hold a nonce and an authentication tag
    #[error("stored blob too short: {actual} bytes, need at least {minimum}")]
    BlobTooShort {
        /// Actual blob length
        actual: usize,
        /// Minimum valid blob length
        minimum: usize,
    },

    /// Base64 metadata field could not be decoded
    #[error("invalid base64 in {field}: {reason}")]
    Base64 {
        /// Which metadata field was malformed
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// Key derivation parameters are unusable
    #[error("invalid kdf parameters: {reason}")]
    InvalidKdfParams {
        /// What is wrong with the parameters
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if this error came from tag verification.
    ///
    /// This is the only signal that distinguishes "wrong passphrase or
    /// tampered data" from malformed input.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }
}
