//! Local employee directory with Argon2id password hashes.

#![allow(clippy::disallowed_types, reason = "Current-user slot is never held across an await")]

use std::sync::{Mutex, MutexGuard, PoisonError};

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use serde::{Deserialize, Serialize};
use strongbox_core::{Employee, Environment};
use zeroize::Zeroizing;

use super::{Identity, IdentityError, IdentityProvider, normalize_email};
use crate::storage::Storage;

/// Argon2id cost parameters for employee passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHashing {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordHashing {
    fn default() -> Self {
        Self { memory_kib: 19 * 1024, iterations: 2, parallelism: 1 }
    }
}

impl PasswordHashing {
    /// Cheapest parameters Argon2 accepts. Tests only.
    pub fn insecure_fast() -> Self {
        Self { memory_kib: 8, iterations: 1, parallelism: 1 }
    }

    fn hasher(&self) -> Result<Argon2<'static>, IdentityError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| IdentityError::PasswordHash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Employee directory backed by [`Storage`].
///
/// Holds the current session's user in memory. Unknown emails are verified
/// against a throwaway hash so they cost the same as a wrong password.
pub struct LocalDirectory<S, E> {
    storage: S,
    env: E,
    hasher: Argon2<'static>,
    /// Hash of a random password nobody knows
    decoy_hash: String,
    current: Mutex<Option<Identity>>,
}

impl<S: Storage, E: Environment> LocalDirectory<S, E> {
    /// Create a directory over `storage`.
    ///
    /// # Errors
    ///
    /// - `PasswordHash`: `hashing` parameters are out of range
    pub fn new(storage: S, env: E, hashing: PasswordHashing) -> Result<Self, IdentityError> {
        let hasher = hashing.hasher()?;
        let decoy = Zeroizing::new(env.random_array::<32>());
        let decoy_hash = hash_password(&hasher, &env, decoy.as_slice())?;

        Ok(Self { storage, env, hasher, decoy_hash, current: Mutex::new(None) })
    }

    /// Add an employee with a password.
    ///
    /// The email is normalized and the password trimmed, matching what
    /// [`IdentityProvider::sign_in`] will compare against.
    ///
    /// # Errors
    ///
    /// - `InvalidRegistration`: empty name, malformed email, or empty password
    /// - `EmailTaken`: another employee already uses this email
    /// - `Storage`: the directory could not be read or written
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Employee, IdentityError> {
        let name = name.trim();
        let email = normalize_email(email);
        let password = password.trim();

        if name.is_empty() {
            return Err(IdentityError::InvalidRegistration { reason: "name is empty" });
        }
        if !email.contains('@') {
            return Err(IdentityError::InvalidRegistration { reason: "email has no '@'" });
        }
        if password.is_empty() {
            return Err(IdentityError::InvalidRegistration { reason: "password is empty" });
        }
        if self.storage.find_employee_by_email(&email)?.is_some() {
            return Err(IdentityError::EmailTaken { email });
        }

        let employee = Employee {
            id: format!("{:016x}", self.env.random_u64()),
            name: name.to_string(),
            email,
        };
        let password_hash = hash_password(&self.hasher, &self.env, password.as_bytes())?;

        self.storage.store_credential(&employee.id, &password_hash)?;
        self.storage.upsert_employee(&employee)?;

        tracing::info!(employee_id = %employee.id, email = %employee.email, "Registered employee");

        Ok(employee)
    }

    /// The backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Identity>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Storage, E: Environment> IdentityProvider for LocalDirectory<S, E> {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = normalize_email(email);

        let employee = self.storage.find_employee_by_email(&email)?;
        let stored = match &employee {
            Some(e) => self.storage.load_credential(&e.id)?,
            None => None,
        };

        let hash = stored.clone().unwrap_or_else(|| self.decoy_hash.clone());
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());

        let verified = tokio::task::spawn_blocking(move || {
            verify_password(&hasher, password.as_bytes(), &hash)
        })
        .await
        .map_err(|e| IdentityError::PasswordHash(e.to_string()))??;

        match employee {
            Some(employee) if stored.is_some() && verified => {
                let identity = Identity { id: employee.id, email: employee.email };
                *self.lock_current() = Some(identity.clone());
                Ok(identity)
            },
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn current_user(&self) -> Option<Identity> {
        self.lock_current().clone()
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if let Some(identity) = self.lock_current().take() {
            tracing::debug!(employee_id = %identity.id, "Signed out");
        }
        Ok(())
    }
}

fn hash_password<E: Environment>(
    hasher: &Argon2<'static>,
    env: &E,
    password: &[u8],
) -> Result<String, IdentityError> {
    let salt = SaltString::encode_b64(&env.random_array::<16>())
        .map_err(|e| IdentityError::PasswordHash(e.to_string()))?;

    let hash = hasher
        .hash_password(password, &salt)
        .map_err(|e| IdentityError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Returns `Ok(false)` on a mismatch; errors only if the stored hash is
/// unreadable.
fn verify_password(
    hasher: &Argon2<'static>,
    password: &[u8],
    hash: &str,
) -> Result<bool, IdentityError> {
    let parsed = PasswordHash::new(hash).map_err(|e| IdentityError::PasswordHash(e.to_string()))?;

    Ok(hasher.verify_password(password, &parsed).is_ok())
}
