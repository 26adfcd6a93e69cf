//! Strongbox core logic
//!
//! Building blocks for the encrypted file-sharing service. Key derivation
//! runs on the Tokio blocking pool, so async entry points must be polled
//! inside a Tokio runtime:
//!
//! - [`MasterKeyProvider`]: lazily derives the company master key from a
//!   passphrase, at most once per cache lifetime, no matter how many callers
//!   ask concurrently
//! - [`EnvelopeCipher`]: encrypts each file under a fresh key and wraps that
//!   key under the master key
//! - [`throttle`]: failed-login counting and exponential lockout arithmetic
//!
//! Time and randomness come from an [`Environment`] so the same logic runs
//! against the system clock in production and a manual clock in tests. No
//! I/O happens here; persistence lives behind traits in the service crate.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod envelope;
pub mod error;
pub mod master_key;
pub mod passphrase;
pub mod records;
pub mod throttle;

pub use env::Environment;
pub use envelope::{EncryptedPayload, EnvelopeCipher};
pub use error::{EnvelopeError, KeyError};
pub use master_key::MasterKeyProvider;
pub use passphrase::{FixedPassphrase, PassphraseSource};
pub use records::{Employee, EncryptedFileRecord, LoginSuccess};
pub use throttle::{AttemptState, LockStatus, LockoutPolicy, LoginAttemptRecord};
