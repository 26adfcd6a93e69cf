//! File sealing and key wrapping using AES-256-GCM
//!
//! All functions are pure: key bytes and nonces are provided by the caller.
//! Both layers use the same primitive, so the only failure that depends on
//! secret material is a tag mismatch.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroizing;

use super::{
    error::CryptoError,
    keys::{FileKey, KEY_SIZE, MasterKey, NONCE_SIZE},
    wire::{SealedFile, WrappedKey},
};

/// Encrypt a file's bytes under its one-time file key.
///
/// # Security
///
/// - Caller MUST provide a fresh random nonce and a fresh file key per file
/// - The returned ciphertext carries the GCM tag
pub fn seal_file(
    plaintext: &[u8],
    file_key: &FileKey,
    nonce: [u8; NONCE_SIZE],
) -> Result<SealedFile, CryptoError> {
    let ciphertext = seal(file_key.key(), &nonce, plaintext)?;
    Ok(SealedFile { nonce, ciphertext })
}

/// Decrypt a sealed file with its recovered file key.
///
/// # Errors
///
/// - `AuthenticationFailed`: wrong file key, or nonce/ciphertext modified
pub fn open_file(sealed: &SealedFile, file_key: &FileKey) -> Result<Vec<u8>, CryptoError> {
    open(file_key.key(), &sealed.nonce, &sealed.ciphertext)
}

/// Wrap a file key under the master key.
///
/// Exports the raw file key bytes, encrypts them with an independent nonce,
/// and returns the base64 transport form.
pub fn wrap_file_key(
    file_key: &FileKey,
    master_key: &MasterKey,
    nonce: [u8; NONCE_SIZE],
) -> Result<WrappedKey, CryptoError> {
    let wrapped = seal(master_key.key(), &nonce, file_key.key())?;
    Ok(WrappedKey::encode(&wrapped, &nonce))
}

/// Recover a file key from its wrapped form.
///
/// The recovered key can only decrypt; it is imported as a [`FileKey`] and
/// the intermediate plaintext bytes are zeroized.
///
/// # Errors
///
/// - `Base64` / `InvalidNonceLength`: malformed metadata
/// - `AuthenticationFailed`: wrong master key (wrong passphrase), or the
///   wrapped key or wrap nonce was modified
/// - `InvalidKeyLength`: the unwrapped payload is not a 256-bit key
pub fn unwrap_file_key(wrapped: &WrappedKey, master_key: &MasterKey) -> Result<FileKey, CryptoError> {
    let (ciphertext, nonce) = wrapped.decode()?;
    let raw = Zeroizing::new(open(master_key.key(), &nonce, &ciphertext)?);
    FileKey::from_slice(&raw)
}

fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed { reason: e.to_string() })
}

fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
