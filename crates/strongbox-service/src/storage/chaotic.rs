//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling and
//! recovery. Injected failures happen before the inner backend is touched, so
//! a failed call never leaves a partial write behind.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use strongbox_core::{Employee, EncryptedFileRecord, LoginAttemptRecord, LoginSuccess};

use super::{FileRecordFilter, Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but randomly fails
/// operations based on a configured failure rate. Uses Arc<Mutex<>> for the
/// RNG state, making it Clone and thread-safe.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operations attempted, including failed ones
    operation_count: Arc<AtomicUsize>,
    /// Operations failed by injection
    injected_failures: Arc<AtomicUsize>,
}

/// Simple deterministic RNG for chaos injection
///
/// Uses linear congruential generator (LCG) for fast, deterministic randomness.
/// This ensures chaos tests are reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            injected_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Number of operations failed by injection.
    pub fn injected_failures(&self) -> usize {
        self.injected_failures.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether to fail it.
    fn roll(&self) -> Result<(), StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        #[allow(clippy::expect_used)]
        let fail = self.rng.lock().expect("ChaoticRng mutex poisoned").next() < self.failure_rate;

        if fail {
            self.injected_failures.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn load_login_attempts(
        &self,
        identity: &str,
    ) -> Result<Option<LoginAttemptRecord>, StorageError> {
        self.roll()?;
        self.inner.load_login_attempts(identity)
    }

    fn update_login_attempts<F>(
        &self,
        identity: &str,
        update: F,
    ) -> Result<LoginAttemptRecord, StorageError>
    where
        F: FnOnce(Option<&LoginAttemptRecord>) -> LoginAttemptRecord,
    {
        self.roll()?;
        self.inner.update_login_attempts(identity, update)
    }

    fn delete_login_attempts(&self, identity: &str) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.delete_login_attempts(identity)
    }

    fn append_login_success(&self, entry: &LoginSuccess) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.append_login_success(entry)
    }

    fn login_successes(&self, identity: &str) -> Result<Vec<LoginSuccess>, StorageError> {
        self.roll()?;
        self.inner.login_successes(identity)
    }

    fn upsert_employee(&self, employee: &Employee) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.upsert_employee(employee)
    }

    fn load_employee(&self, id: &str) -> Result<Option<Employee>, StorageError> {
        self.roll()?;
        self.inner.load_employee(id)
    }

    fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StorageError> {
        self.roll()?;
        self.inner.find_employee_by_email(email)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        self.roll()?;
        self.inner.list_employees()
    }

    fn store_credential(&self, employee_id: &str, password_hash: &str) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.store_credential(employee_id, password_hash)
    }

    fn load_credential(&self, employee_id: &str) -> Result<Option<String>, StorageError> {
        self.roll()?;
        self.inner.load_credential(employee_id)
    }

    fn insert_file_records(&self, records: &[EncryptedFileRecord]) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.insert_file_records(records)
    }

    fn load_file_record(&self, id: u64) -> Result<Option<EncryptedFileRecord>, StorageError> {
        self.roll()?;
        self.inner.load_file_record(id)
    }

    fn list_file_records(
        &self,
        filter: &FileRecordFilter,
    ) -> Result<Vec<EncryptedFileRecord>, StorageError> {
        self.roll()?;
        self.inner.list_file_records(filter)
    }
}
