//! Strongbox service.
//!
//! Production glue around [`strongbox_core`]: the stores, the identity
//! provider, and the two user-facing services that tie them together.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────── Session ─────────────┐
//!            │  LoginService      FileSharing   │
//!            │      │   \           /   │   \   │
//!            │      │  MasterKeyProvider │    \  │
//!            └──────┼────────────────────┼─────┼─┘
//!                   ▼                    ▼     ▼
//!          IdentityProvider          Storage  ObjectStore
//! ```
//!
//! # Components
//!
//! - [`Storage`]: metadata (attempt counters, audit log, employees, file
//!   records) with memory, chaos, and redb backends
//! - [`ObjectStore`]: encrypted blobs, in memory or one file per blob
//! - [`IdentityProvider`]: credential checks; [`LocalDirectory`] keeps
//!   Argon2id hashes in [`Storage`]
//! - [`LoginService`]: lockout-gated login and logout
//! - [`FileSharing`]: send, list, and download
//! - [`Session`]: one employee's services sharing one key cache
//! - [`SystemEnv`]: system clock and OS RNG

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
mod error;
pub mod identity;
pub mod objects;
mod prompt;
pub mod session;
pub mod sharing;
pub mod storage;
mod system_env;

pub use auth::{LoginError, LoginService};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use identity::{Identity, IdentityError, IdentityProvider, LocalDirectory, PasswordHashing};
pub use objects::{DirObjectStore, MemoryObjectStore, ObjectStore, ObjectStoreError};
pub use prompt::{TerminalPassphrase, read_secret};
pub use session::{LocalSession, Session};
pub use sharing::{FileListing, FileSharing, Recipients, SharingError};
pub use storage::{
    ChaoticStorage, FileRecordFilter, MemoryStorage, RedbStorage, Storage, StorageError,
};
pub use system_env::SystemEnv;
