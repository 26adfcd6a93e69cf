//! Envelope encryption: per-file keys wrapped under a passphrase-derived key
//!
//! # Architecture
//!
//! ```text
//! passphrase ──PBKDF2──▶ MasterKey ──wrap──▶ WrappedKey
//!                                              │
//! FileKey ─────────────────────────────────────┘
//!    │
//!    ▼ seal
//! SealedFile ──to_blob──▶ nonce || ciphertext
//! ```
//!
//! # Security Properties
//!
//! - Key separation: file contents and key wrapping use independent nonces
//! - Integrity: every layer is authenticated, nothing is returned before the
//!   tag verifies
//! - Non-exportable master key: only this crate can read its bytes

pub mod derivation;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod wire;

pub use derivation::{DEFAULT_ITERATIONS, DEFAULT_SALT, KdfParams, derive_master_key};
pub use encryption::{open_file, seal_file, unwrap_file_key, wrap_file_key};
pub use error::CryptoError;
pub use keys::{FileKey, KEY_SIZE, MasterKey, NONCE_SIZE, TAG_SIZE};
pub use wire::{SealedFile, WrappedKey};
