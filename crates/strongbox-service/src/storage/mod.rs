//! Metadata storage for Strongbox
//!
//! Trait-based abstraction for login attempt counters, the login audit log,
//! the employee directory with its credentials, and shared-file records. The
//! trait is synchronous (no async) to keep backends simple; the services call
//! it between awaits and never hold anything across one.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
use strongbox_core::{Employee, EncryptedFileRecord, LoginAttemptRecord, LoginSuccess};

pub use self::redb::RedbStorage;

/// Which side of a shared file to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRecordFilter {
    /// Records whose recipient is this employee id
    ReceivedBy(String),
    /// Records whose sender is this employee id
    SentBy(String),
}

impl FileRecordFilter {
    /// Returns true if `record` belongs in this listing.
    pub fn matches(&self, record: &EncryptedFileRecord) -> bool {
        match self {
            Self::ReceivedBy(id) => record.recipient_id == *id,
            Self::SentBy(id) => record.sender_id == *id,
        }
    }
}

/// Storage abstraction for Strongbox metadata
///
/// Must be Clone (shared between the login and sharing services), Send + Sync
/// (thread-safe), and synchronous (no async methods). Implementations share
/// internal state via Arc, so clones access the same underlying storage.
///
/// Identities passed to the login-attempt methods are already normalized by
/// the caller; backends compare them byte for byte.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Load the failed-login counter for an identity.
    ///
    /// Returns `None` if the identity has no recorded failures.
    fn load_login_attempts(
        &self,
        identity: &str,
    ) -> Result<Option<LoginAttemptRecord>, StorageError>;

    /// Atomically replace the failed-login counter for an identity.
    ///
    /// `update` receives the current record (if any) and returns the new one.
    /// The read and the write happen under one lock or one write transaction,
    /// so two concurrent failures always produce two increments.
    ///
    /// # Invariants
    ///
    /// - Post: the stored record equals the returned record
    fn update_login_attempts<F>(
        &self,
        identity: &str,
        update: F,
    ) -> Result<LoginAttemptRecord, StorageError>
    where
        F: FnOnce(Option<&LoginAttemptRecord>) -> LoginAttemptRecord;

    /// Delete the failed-login counter for an identity.
    ///
    /// Idempotent: deleting a missing record succeeds.
    fn delete_login_attempts(&self, identity: &str) -> Result<(), StorageError>;

    /// Append an entry to the successful-login audit log.
    fn append_login_success(&self, entry: &LoginSuccess) -> Result<(), StorageError>;

    /// Successful logins for an identity, oldest first.
    fn login_successes(&self, identity: &str) -> Result<Vec<LoginSuccess>, StorageError>;

    /// Insert or replace an employee, keyed by id.
    fn upsert_employee(&self, employee: &Employee) -> Result<(), StorageError>;

    /// Load an employee by id.
    fn load_employee(&self, id: &str) -> Result<Option<Employee>, StorageError>;

    /// Find an employee by exact email.
    fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StorageError>;

    /// All employees, ordered by id.
    fn list_employees(&self) -> Result<Vec<Employee>, StorageError>;

    /// Store the password hash (PHC string) for an employee.
    ///
    /// Overwrites any existing hash.
    fn store_credential(&self, employee_id: &str, password_hash: &str) -> Result<(), StorageError>;

    /// Load the password hash for an employee.
    fn load_credential(&self, employee_id: &str) -> Result<Option<String>, StorageError>;

    /// Insert shared-file records as one batch.
    ///
    /// All-or-nothing: if any record id already exists, nothing is written
    /// and `StorageError::Conflict` is returned.
    fn insert_file_records(&self, records: &[EncryptedFileRecord]) -> Result<(), StorageError>;

    /// Load a shared-file record by id.
    fn load_file_record(&self, id: u64) -> Result<Option<EncryptedFileRecord>, StorageError>;

    /// Shared-file records matching `filter`, newest first.
    ///
    /// Records with the same timestamp are ordered by id, highest first.
    fn list_file_records(
        &self,
        filter: &FileRecordFilter,
    ) -> Result<Vec<EncryptedFileRecord>, StorageError>;
}

/// Ordering key for listings: newest first, ties broken by id.
pub(crate) fn newest_first(a: &EncryptedFileRecord, b: &EncryptedFileRecord) -> std::cmp::Ordering {
    (b.created_at_ms, b.id).cmp(&(a.created_at_ms, a.id))
}
