//! Throttled employee login.
//!
//! [`LoginService`] puts the failed-attempt lockout in front of an
//! [`IdentityProvider`]. Counters are keyed by the normalized email, so the
//! lock follows the identity being attacked regardless of which session the
//! attempts come from.
//!
//! # Flow
//!
//! ```text
//! login(email, password)
//!   ├─ empty input ───────────────▶ MissingCredentials
//!   ├─ now < lock_until ──────────▶ Locked (provider not called)
//!   ├─ provider rejects ──────────▶ InvalidCredentials (failure counted)
//!   └─ provider accepts
//!        ├─ counter reset fails ──▶ sign out, Storage
//!        └─ counter reset ────────▶ audit, Identity
//! ```

use std::sync::Arc;

use strongbox_core::{
    AttemptState, Environment, LockStatus, LockoutPolicy, LoginSuccess, MasterKeyProvider,
    PassphraseSource,
};
use thiserror::Error;

use crate::{
    identity::{Identity, IdentityError, IdentityProvider, normalize_email},
    storage::{Storage, StorageError},
};

/// Errors from [`LoginService::login`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Email or password was empty after trimming
    #[error("email and password are required")]
    MissingCredentials,

    /// The identity is inside a lock window
    ///
    /// Credentials were not checked and the counter was not touched.
    #[error("too many attempts, try again after {remaining_minutes} minutes")]
    Locked {
        /// Minutes until the lock expires, rounded up
        remaining_minutes: u64,
    },

    /// Wrong email or password
    #[error("invalid email or password")]
    InvalidCredentials {
        /// Consecutive failures including this one
        attempts: u32,
        /// Lock applied by this failure, if the threshold was reached
        lock_minutes: Option<u64>,
    },

    /// Attempt counters could not be read or written
    ///
    /// The login is refused; a broken counter store must not open the gate.
    #[error("login state unavailable: {0}")]
    Storage(#[from] StorageError),

    /// The identity provider failed for a reason other than bad credentials
    #[error("identity provider error: {0}")]
    Identity(IdentityError),
}

impl LoginError {
    /// Returns true if the caller should wait before retrying.
    ///
    /// Covers both an existing lock and a failure that just started one.
    pub fn is_locked(&self) -> bool {
        match self {
            Self::Locked { .. } => true,
            Self::InvalidCredentials { lock_minutes, .. } => lock_minutes.is_some(),
            _ => false,
        }
    }
}

/// Login and logout with lockout.
///
/// Holds the session's [`MasterKeyProvider`] so that signing in or out always
/// drops the previous user's master key.
pub struct LoginService<E, S, I, P> {
    env: E,
    storage: S,
    identity: Arc<I>,
    keys: Arc<MasterKeyProvider<P>>,
    policy: LockoutPolicy,
}

impl<E, S, I, P> LoginService<E, S, I, P>
where
    E: Environment,
    S: Storage,
    I: IdentityProvider,
    P: PassphraseSource,
{
    /// Create a login service.
    pub fn new(
        env: E,
        storage: S,
        identity: Arc<I>,
        keys: Arc<MasterKeyProvider<P>>,
        policy: LockoutPolicy,
    ) -> Self {
        Self { env, storage, identity, keys, policy }
    }

    /// The lockout policy in force.
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Authenticate an employee.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials`: blank email or password
    /// - `Locked`: identity is locked; the provider was not consulted
    /// - `InvalidCredentials`: provider rejected the credentials; the failure
    ///   was counted
    /// - `Storage`: counters unavailable. Either nothing was checked, or the
    ///   credentials were accepted but the counter could not be reset and the
    ///   provider session was signed out again
    /// - `Identity`: provider failed without judging the credentials
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, LoginError> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let identity = normalize_email(email);

        let now_ms = self.env.wall_clock_millis();
        if let Some(record) = self.storage.load_login_attempts(&identity)?
            && let LockStatus::Locked { remaining_minutes } = record.lock_status(now_ms)
        {
            tracing::warn!(
                identity = %identity,
                remaining_minutes,
                "Login rejected, identity locked"
            );
            return Err(LoginError::Locked { remaining_minutes });
        }

        match self.identity.sign_in(&identity, password).await {
            Ok(user) => {
                self.keys.clear();
                self.record_success(&identity).await?;
                tracing::info!(identity = %identity, employee_id = %user.id, "Login succeeded");
                Ok(user)
            },
            Err(e) if e.is_credential_failure() => Err(self.record_failure(&identity)?),
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Identity provider failed");
                Err(LoginError::Identity(e))
            },
        }
    }

    /// End the session.
    ///
    /// The master key is cleared before the provider is asked to sign out,
    /// so a failing sign-out still leaves no key behind.
    pub async fn logout(&self) -> Result<(), LoginError> {
        self.keys.clear();
        self.identity.sign_out().await.map_err(LoginError::Identity)?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// The signed-in employee, if any.
    pub async fn current_user(&self) -> Option<Identity> {
        self.identity.current_user().await
    }

    /// Count a failure and build the error returned to the caller.
    fn record_failure(&self, identity: &str) -> Result<LoginError, StorageError> {
        let now_ms = self.env.wall_clock_millis();
        let policy = self.policy;

        let record = self.storage.update_login_attempts(identity, |previous| {
            policy.register_failure(identity, previous, now_ms)
        })?;

        match policy.state(Some(&record)) {
            AttemptState::Locked { attempts } => tracing::warn!(
                identity = %identity,
                attempts,
                lock_minutes = record.lock_minutes,
                "Login failed, identity locked"
            ),
            _ => tracing::info!(identity = %identity, attempts = record.attempts, "Login failed"),
        }

        Ok(LoginError::InvalidCredentials {
            attempts: record.attempts,
            lock_minutes: record.lock_minutes,
        })
    }

    /// Reset the counter and append to the audit log.
    ///
    /// A counter that cannot be reset would keep earlier failures alive
    /// against the next attempt, so that failure undoes the sign-in. An audit
    /// append failure is only logged.
    async fn record_success(&self, identity: &str) -> Result<(), LoginError> {
        if let Err(e) = self.storage.delete_login_attempts(identity) {
            tracing::error!(
                identity = %identity,
                error = %e,
                "Failed to reset login attempts, signing out"
            );
            if let Err(sign_out) = self.identity.sign_out().await {
                tracing::error!(identity = %identity, error = %sign_out, "Sign-out failed");
            }
            return Err(e.into());
        }

        let login_time_ms = self.env.wall_clock_millis();
        let entry = LoginSuccess { identity: identity.to_string(), login_time_ms };
        if let Err(e) = self.storage.append_login_success(&entry) {
            tracing::error!(identity = %identity, error = %e, "Failed to record login success");
        }

        Ok(())
    }
}
