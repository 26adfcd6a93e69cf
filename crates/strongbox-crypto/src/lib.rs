//! Strongbox Cryptographic Primitives
//!
//! Building blocks for Strongbox's per-file envelope encryption. Pure
//! functions with deterministic outputs. Callers provide key bytes and nonces
//! so every operation can be reproduced in tests.
//!
//! # Key Hierarchy
//!
//! An operator passphrase is stretched into a session-lifetime master key.
//! Every uploaded file gets its own random file key, which encrypts exactly
//! one file. The file key is then wrapped (encrypted) under the master key
//! and stored next to the file's metadata.
//!
//! ```text
//! Operator Passphrase
//!        │
//!        ▼
//! PBKDF2-SHA256 (fixed salt, 100k rounds) → Master Key (session only)
//!        │
//!        ▼ AES-256-GCM wrap (own nonce)
//! Wrapped File Key (base64, stored as metadata)
//!        ▲
//!        │ raw bytes
//! File Key (random, one per file)
//!        │
//!        ▼ AES-256-GCM (own nonce)
//! Stored Blob = nonce(12) || ciphertext || tag(16)
//! ```
//!
//! # Security
//!
//! Blast radius:
//! - One file key exposes one file
//! - The master key never leaves process memory and is never exported
//!
//! Authenticity:
//! - Both layers use AES-256-GCM, so tampering with the blob, the wrapped
//!   key, or either nonce fails the authentication tag
//! - A wrong passphrase derives a wrong master key, which fails the same way
//!   as tampering: [`CryptoError::AuthenticationFailed`]
//!
//! Hygiene:
//! - Key types zeroize on drop
//! - Nonces are 96-bit and must never repeat under one key

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;

pub use envelope::{
    CryptoError, DEFAULT_ITERATIONS, DEFAULT_SALT, FileKey, KEY_SIZE, KdfParams, MasterKey,
    NONCE_SIZE, SealedFile, TAG_SIZE, WrappedKey, derive_master_key, open_file, seal_file,
    unwrap_file_key, wrap_file_key,
};
