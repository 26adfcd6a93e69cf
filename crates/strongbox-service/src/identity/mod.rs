//! Employee identity
//!
//! Who is signed in, and how credentials are checked. Login throttling sits
//! in front of this layer; providers only answer "is this password right".

mod local;

use std::future::Future;

pub use local::{LocalDirectory, PasswordHashing};
use thiserror::Error;

use crate::storage::StorageError;

/// A signed-in employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Employee id
    pub id: String,
    /// Normalized login email
    pub email: String,
}

/// Errors from identity providers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Unknown email or wrong password (deliberately not distinguished)
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Registration with an email that is already in the directory
    #[error("email already registered: {email}")]
    EmailTaken {
        /// The clashing email
        email: String,
    },

    /// Registration input rejected
    #[error("invalid registration: {reason}")]
    InvalidRegistration {
        /// What is wrong with the input
        reason: &'static str,
    },

    /// Password hashing or verification could not run
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Directory storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IdentityError {
    /// Returns true if the caller supplied wrong credentials.
    ///
    /// Only these failures count towards the login lockout; infrastructure
    /// errors do not.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }
}

/// Credential check and session tracking.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Verify credentials and make the employee the current user.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, IdentityError>> + Send;

    /// The signed-in employee, if any.
    fn current_user(&self) -> impl Future<Output = Option<Identity>> + Send;

    /// End the current session.
    ///
    /// Idempotent: signing out with no current user succeeds.
    fn sign_out(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;
}

/// Canonical form of a login email: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
