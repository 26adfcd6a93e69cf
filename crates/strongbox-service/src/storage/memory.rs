#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use strongbox_core::{Employee, EncryptedFileRecord, LoginAttemptRecord, LoginSuccess};

use super::{FileRecordFilter, Storage, StorageError, newest_first};

/// In-memory storage implementation for testing and simulation
///
/// All state is wrapped in Arc<Mutex<>> to allow Clone and concurrent access.
/// Thread-safe through Mutex, but uses `lock().expect()` which will panic if
/// the mutex is poisoned - acceptable for test code. Batch inserts and
/// read-modify-write updates run under a single lock acquisition, which gives
/// them the same atomicity as a redb write transaction.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Failed-login counters keyed by identity
    login_attempts: HashMap<String, LoginAttemptRecord>,

    /// Successful-login audit log, append order
    login_successes: Vec<LoginSuccess>,

    /// Employees keyed by id (ordered for listing)
    employees: BTreeMap<String, Employee>,

    /// Password hashes keyed by employee id
    credentials: HashMap<String, String>,

    /// Shared-file records, insertion order
    file_records: Vec<EncryptedFileRecord>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryStorageInner::default())) }
    }

    /// Total number of shared-file records.
    ///
    /// Useful for debugging and testing.
    pub fn file_record_count(&self) -> usize {
        self.lock().file_records.len()
    }

    /// Number of identities with a failed-login counter.
    ///
    /// Useful for debugging and testing.
    pub fn login_attempt_count(&self) -> usize {
        self.lock().login_attempts.len()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/simulation code.
    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, MemoryStorageInner> {
        self.inner.lock().expect("Mutex poisoned")
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn load_login_attempts(
        &self,
        identity: &str,
    ) -> Result<Option<LoginAttemptRecord>, StorageError> {
        Ok(self.lock().login_attempts.get(identity).cloned())
    }

    fn update_login_attempts<F>(
        &self,
        identity: &str,
        update: F,
    ) -> Result<LoginAttemptRecord, StorageError>
    where
        F: FnOnce(Option<&LoginAttemptRecord>) -> LoginAttemptRecord,
    {
        let mut inner = self.lock();

        let record = update(inner.login_attempts.get(identity));
        inner.login_attempts.insert(identity.to_string(), record.clone());

        Ok(record)
    }

    fn delete_login_attempts(&self, identity: &str) -> Result<(), StorageError> {
        self.lock().login_attempts.remove(identity);
        Ok(())
    }

    fn append_login_success(&self, entry: &LoginSuccess) -> Result<(), StorageError> {
        self.lock().login_successes.push(entry.clone());
        Ok(())
    }

    fn login_successes(&self, identity: &str) -> Result<Vec<LoginSuccess>, StorageError> {
        let inner = self.lock();

        Ok(inner.login_successes.iter().filter(|e| e.identity == identity).cloned().collect())
    }

    fn upsert_employee(&self, employee: &Employee) -> Result<(), StorageError> {
        self.lock().employees.insert(employee.id.clone(), employee.clone());
        Ok(())
    }

    fn load_employee(&self, id: &str) -> Result<Option<Employee>, StorageError> {
        Ok(self.lock().employees.get(id).cloned())
    }

    fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StorageError> {
        let inner = self.lock();

        Ok(inner.employees.values().find(|e| e.email == email).cloned())
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        Ok(self.lock().employees.values().cloned().collect())
    }

    fn store_credential(&self, employee_id: &str, password_hash: &str) -> Result<(), StorageError> {
        self.lock().credentials.insert(employee_id.to_string(), password_hash.to_string());
        Ok(())
    }

    fn load_credential(&self, employee_id: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().credentials.get(employee_id).cloned())
    }

    fn insert_file_records(&self, records: &[EncryptedFileRecord]) -> Result<(), StorageError> {
        let mut inner = self.lock();

        // Validate the whole batch before touching state
        for (i, record) in records.iter().enumerate() {
            let clashes_existing = inner.file_records.iter().any(|r| r.id == record.id);
            let clashes_batch = records[..i].iter().any(|r| r.id == record.id);
            if clashes_existing || clashes_batch {
                return Err(StorageError::Conflict { id: record.id });
            }
        }

        inner.file_records.extend_from_slice(records);

        Ok(())
    }

    fn load_file_record(&self, id: u64) -> Result<Option<EncryptedFileRecord>, StorageError> {
        Ok(self.lock().file_records.iter().find(|r| r.id == id).cloned())
    }

    fn list_file_records(
        &self,
        filter: &FileRecordFilter,
    ) -> Result<Vec<EncryptedFileRecord>, StorageError> {
        let inner = self.lock();

        let mut records: Vec<_> =
            inner.file_records.iter().filter(|r| filter.matches(r)).cloned().collect();
        records.sort_by(newest_first);

        Ok(records)
    }
}
