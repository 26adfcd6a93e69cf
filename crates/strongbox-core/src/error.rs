//! Error types for key handling and envelope encryption.
//!
//! Callers branch on these: a [`EnvelopeError::WrongPassphraseOrCorrupted`]
//! means the cached master key has already been discarded and the next
//! operation will prompt again, while a [`EnvelopeError::MissingPassphrase`]
//! means the user cancelled and nothing was cached.

use strongbox_crypto::CryptoError;
use thiserror::Error;

/// Errors from obtaining the master key.
///
/// `Clone` because one derivation outcome is shared by every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Passphrase source returned nothing or an empty string
    #[error("company passphrase required")]
    MissingPassphrase,

    /// Key derivation could not run or rejected its parameters
    #[error("master key derivation failed: {reason}")]
    DerivationFailed {
        /// Underlying cause
        reason: String,
    },
}

/// Errors from encrypting or decrypting a file envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Passphrase source returned nothing or an empty string
    #[error("company passphrase required")]
    MissingPassphrase,

    /// Encrypting the file or wrapping its key failed
    #[error("encryption failed: {source}")]
    EncryptionFailed {
        /// Underlying primitive failure
        #[source]
        source: CryptoError,
    },

    /// Authentication tag mismatch while unwrapping the key or opening the
    /// file. Indistinguishable cases: wrong passphrase, tampered metadata,
    /// tampered blob.
    #[error("company passphrase is incorrect or the file is corrupted")]
    WrongPassphraseOrCorrupted,

    /// Stored metadata or blob is malformed (bad base64, wrong lengths)
    #[error("malformed envelope: {0}")]
    Malformed(#[source] CryptoError),

    /// Master key could not be derived
    #[error(transparent)]
    Key(KeyError),
}

impl EnvelopeError {
    /// Returns true if the master key cache was reset by this failure.
    ///
    /// Only an authentication failure does this: it is the one signal that
    /// the cached key may come from a mistyped passphrase.
    pub fn requires_key_reset(&self) -> bool {
        matches!(self, Self::WrongPassphraseOrCorrupted)
    }
}

impl From<KeyError> for EnvelopeError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::MissingPassphrase => Self::MissingPassphrase,
            other @ KeyError::DerivationFailed { .. } => Self::Key(other),
        }
    }
}
