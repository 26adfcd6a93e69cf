//! Envelope encryption of whole files.
//!
//! Each file gets a fresh 256-bit key and nonce. The file key is wrapped
//! under the shared master key, so anyone holding the company passphrase can
//! open any file, and the master key itself never touches storage.

use std::sync::Arc;

use strongbox_crypto::{
    CryptoError, FileKey, SealedFile, WrappedKey, open_file, seal_file, unwrap_file_key,
    wrap_file_key,
};

use crate::{
    env::Environment, error::EnvelopeError, master_key::MasterKeyProvider,
    passphrase::PassphraseSource,
};

/// Output of [`EnvelopeCipher::encrypt`].
///
/// `sealed` goes to object storage as a blob; `wrapped_key` goes into every
/// metadata record that points at that blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// File ciphertext with its nonce
    pub sealed: SealedFile,
    /// File key wrapped under the master key
    pub wrapped_key: WrappedKey,
}

/// Encrypts and decrypts files using keys from a [`MasterKeyProvider`].
pub struct EnvelopeCipher<E, P> {
    env: E,
    keys: Arc<MasterKeyProvider<P>>,
}

impl<E: Environment, P: PassphraseSource> EnvelopeCipher<E, P> {
    /// Create a cipher sharing `keys` with the rest of the session.
    pub fn new(env: E, keys: Arc<MasterKeyProvider<P>>) -> Self {
        Self { env, keys }
    }

    /// The master key provider backing this cipher.
    pub fn key_provider(&self) -> &Arc<MasterKeyProvider<P>> {
        &self.keys
    }

    /// Encrypt a file under a fresh key and wrap that key.
    ///
    /// The file is sealed before the master key is requested, so a cancelled
    /// prompt discards the one-time key without side effects.
    ///
    /// # Errors
    ///
    /// - `MissingPassphrase`: the passphrase prompt was cancelled
    /// - `EncryptionFailed`: the AEAD rejected the input
    /// - `Key`: master key derivation failed
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedPayload, EnvelopeError> {
        let file_key = FileKey::from_bytes(self.env.random_array());
        let sealed = seal_file(plaintext, &file_key, self.env.random_array())
            .map_err(|source| EnvelopeError::EncryptionFailed { source })?;

        let master_key = self.keys.get().await?;
        let wrapped_key = wrap_file_key(&file_key, &master_key, self.env.random_array())
            .map_err(|source| EnvelopeError::EncryptionFailed { source })?;

        Ok(EncryptedPayload { sealed, wrapped_key })
    }

    /// Recover a file's plaintext.
    ///
    /// On an authentication failure the master key cache is cleared before
    /// returning, so the next operation prompts for the passphrase again.
    ///
    /// # Errors
    ///
    /// - `MissingPassphrase`: the passphrase prompt was cancelled
    /// - `WrongPassphraseOrCorrupted`: tag mismatch on the key or the file
    /// - `Malformed`: metadata is not valid base64 or has the wrong shape
    /// - `Key`: master key derivation failed
    pub async fn decrypt(
        &self,
        sealed: &SealedFile,
        wrapped_key: &WrappedKey,
    ) -> Result<Vec<u8>, EnvelopeError> {
        let master_key = self.keys.get().await?;

        let result =
            unwrap_file_key(wrapped_key, &master_key).and_then(|file_key| open_file(sealed, &file_key));
        drop(master_key);

        match result {
            Ok(plaintext) => Ok(plaintext),
            Err(CryptoError::AuthenticationFailed) => {
                self.keys.clear();
                tracing::warn!("Decryption failed authentication, master key cleared");
                Err(EnvelopeError::WrongPassphraseOrCorrupted)
            },
            Err(e) => Err(EnvelopeError::Malformed(e)),
        }
    }

    /// Parse a stored blob and decrypt it.
    ///
    /// A blob too short to hold a nonce and tag cannot come from
    /// [`Self::encrypt`]; it is reported as `Malformed` without touching the
    /// master key.
    pub async fn decrypt_blob(
        &self,
        blob: &[u8],
        wrapped_key: &WrappedKey,
    ) -> Result<Vec<u8>, EnvelopeError> {
        let sealed = SealedFile::from_blob(blob).map_err(EnvelopeError::Malformed)?;
        self.decrypt(&sealed, wrapped_key).await
    }
}
