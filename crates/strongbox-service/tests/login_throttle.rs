//! Login lockout tests
//!
//! Drives `LoginService` with a manual clock to check the lock ladder, the
//! pre-authentication gate, and the reset on success.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use strongbox_core::{
    Employee, EncryptedFileRecord, Environment, FixedPassphrase, LockoutPolicy,
    LoginAttemptRecord, LoginSuccess, MasterKeyProvider, env::test_utils::MockEnv,
};
use strongbox_crypto::KdfParams;
use strongbox_service::{
    ChaoticStorage, FileRecordFilter, Identity, IdentityError, IdentityProvider, LoginError,
    LoginService, MemoryStorage, Storage, StorageError,
};

const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "hunter2";

/// Accepts one fixed email/password pair and counts every call.
struct StubProvider {
    calls: AtomicUsize,
    sign_outs: AtomicUsize,
}

impl StubProvider {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0), sign_outs: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for StubProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if email == EMAIL && password == PASSWORD {
            Ok(Identity { id: "alice".to_string(), email: email.to_string() })
        } else {
            Err(IdentityError::InvalidCredentials)
        }
    }

    async fn current_user(&self) -> Option<Identity> {
        None
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Storage that cannot delete login counters.
#[derive(Clone)]
struct StuckCounters(MemoryStorage);

impl Storage for StuckCounters {
    fn load_login_attempts(
        &self,
        identity: &str,
    ) -> Result<Option<LoginAttemptRecord>, StorageError> {
        self.0.load_login_attempts(identity)
    }

    fn update_login_attempts<F>(
        &self,
        identity: &str,
        update: F,
    ) -> Result<LoginAttemptRecord, StorageError>
    where
        F: FnOnce(Option<&LoginAttemptRecord>) -> LoginAttemptRecord,
    {
        self.0.update_login_attempts(identity, update)
    }

    fn delete_login_attempts(&self, _identity: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("delete rejected".to_string()))
    }

    fn append_login_success(&self, entry: &LoginSuccess) -> Result<(), StorageError> {
        self.0.append_login_success(entry)
    }

    fn login_successes(&self, identity: &str) -> Result<Vec<LoginSuccess>, StorageError> {
        self.0.login_successes(identity)
    }

    fn upsert_employee(&self, employee: &Employee) -> Result<(), StorageError> {
        self.0.upsert_employee(employee)
    }

    fn load_employee(&self, id: &str) -> Result<Option<Employee>, StorageError> {
        self.0.load_employee(id)
    }

    fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StorageError> {
        self.0.find_employee_by_email(email)
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        self.0.list_employees()
    }

    fn store_credential(&self, employee_id: &str, password_hash: &str) -> Result<(), StorageError> {
        self.0.store_credential(employee_id, password_hash)
    }

    fn load_credential(&self, employee_id: &str) -> Result<Option<String>, StorageError> {
        self.0.load_credential(employee_id)
    }

    fn insert_file_records(&self, records: &[EncryptedFileRecord]) -> Result<(), StorageError> {
        self.0.insert_file_records(records)
    }

    fn load_file_record(&self, id: u64) -> Result<Option<EncryptedFileRecord>, StorageError> {
        self.0.load_file_record(id)
    }

    fn list_file_records(
        &self,
        filter: &FileRecordFilter,
    ) -> Result<Vec<EncryptedFileRecord>, StorageError> {
        self.0.list_file_records(filter)
    }
}

struct Harness<S: Storage> {
    env: MockEnv,
    storage: S,
    provider: Arc<StubProvider>,
    keys: Arc<MasterKeyProvider<FixedPassphrase>>,
    service: LoginService<MockEnv, S, StubProvider, FixedPassphrase>,
}

fn harness_with<S: Storage>(storage: S) -> Harness<S> {
    let env = MockEnv::default();
    let provider = Arc::new(StubProvider::new());
    let params = KdfParams { salt: b"test".to_vec(), iterations: 1 };
    let keys = Arc::new(MasterKeyProvider::with_params(FixedPassphrase::new("company"), params));
    let service = LoginService::new(
        env.clone(),
        storage.clone(),
        Arc::clone(&provider),
        Arc::clone(&keys),
        LockoutPolicy::default(),
    );

    Harness { env, storage, provider, keys, service }
}

fn harness() -> Harness<MemoryStorage> {
    harness_with(MemoryStorage::new())
}

#[tokio::test]
async fn blank_credentials_rejected_without_counting() {
    let h = harness();

    assert_eq!(h.service.login("   ", PASSWORD).await, Err(LoginError::MissingCredentials));
    assert_eq!(h.service.login(EMAIL, " \t ").await, Err(LoginError::MissingCredentials));

    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.storage.login_attempt_count(), 0);
}

#[tokio::test]
async fn third_failure_locks_for_five_minutes() {
    let h = harness();

    for expected in 1..=2 {
        let result = h.service.login(EMAIL, "wrong").await;
        let expected = LoginError::InvalidCredentials { attempts: expected, lock_minutes: None };
        assert_eq!(result, Err(expected));
    }

    let result = h.service.login(EMAIL, "wrong").await;
    assert_eq!(result, Err(LoginError::InvalidCredentials { attempts: 3, lock_minutes: Some(5) }));

    let record = h.storage.load_login_attempts(EMAIL).unwrap().unwrap();
    assert_eq!(record.lock_until_ms, Some(h.env.wall_clock_millis() + 5 * 60_000));
}

#[tokio::test]
async fn locked_identity_is_not_checked() {
    let h = harness();
    for _ in 0..3 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }
    let calls_before = h.provider.calls();

    // Correct password is refused as well
    let result = h.service.login(EMAIL, PASSWORD).await;

    assert_eq!(result, Err(LoginError::Locked { remaining_minutes: 5 }));
    assert_eq!(h.provider.calls(), calls_before);
    assert_eq!(h.storage.load_login_attempts(EMAIL).unwrap().unwrap().attempts, 3);
}

#[tokio::test]
async fn remaining_minutes_round_up() {
    let h = harness();
    for _ in 0..3 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }

    h.env.advance_millis(4 * 60_000 + 1_000);
    let result = h.service.login(EMAIL, "wrong").await;
    assert_eq!(result, Err(LoginError::Locked { remaining_minutes: 1 }));

    h.env.advance_millis(58_999);
    let result = h.service.login(EMAIL, "wrong").await;
    assert_eq!(result, Err(LoginError::Locked { remaining_minutes: 1 }));
}

#[tokio::test]
async fn lock_doubles_after_expiry() {
    let h = harness();
    for _ in 0..3 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }

    h.env.advance_minutes(5);
    let result = h.service.login(EMAIL, "wrong").await;
    assert_eq!(result, Err(LoginError::InvalidCredentials { attempts: 4, lock_minutes: Some(10) }));

    h.env.advance_minutes(10);
    let result = h.service.login(EMAIL, "wrong").await;
    assert_eq!(result, Err(LoginError::InvalidCredentials { attempts: 5, lock_minutes: Some(20) }));
}

#[tokio::test]
async fn success_resets_counter_and_audits() {
    let h = harness();
    for _ in 0..2 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }

    let user = h.service.login(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(user.id, "alice");
    assert_eq!(h.storage.load_login_attempts(EMAIL).unwrap(), None);

    let successes = h.storage.login_successes(EMAIL).unwrap();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].identity, EMAIL);

    let result = h.service.login(EMAIL, "wrong").await;
    assert_eq!(result, Err(LoginError::InvalidCredentials { attempts: 1, lock_minutes: None }));
}

#[tokio::test]
async fn unresettable_counter_refuses_login() {
    let h = harness_with(StuckCounters(MemoryStorage::new()));
    for _ in 0..2 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }

    let result = h.service.login(EMAIL, PASSWORD).await;

    assert!(matches!(result, Err(LoginError::Storage(StorageError::Io(_)))));
    assert_eq!(h.provider.sign_outs(), 1);
    assert!(h.storage.login_successes(EMAIL).unwrap().is_empty());
    assert_eq!(h.storage.load_login_attempts(EMAIL).unwrap().unwrap().attempts, 2);
}

#[tokio::test]
async fn success_after_lock_expiry() {
    let h = harness();
    for _ in 0..3 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }

    h.env.advance_minutes(5);
    assert!(h.service.login(EMAIL, PASSWORD).await.is_ok());
    assert_eq!(h.storage.login_attempt_count(), 0);
}

#[tokio::test]
async fn email_variants_share_one_counter() {
    let h = harness();

    let _ = h.service.login("Alice@Example.com", "wrong").await;
    let _ = h.service.login("  ALICE@example.COM ", "wrong").await;
    let result = h.service.login(EMAIL, "wrong").await;

    assert_eq!(result, Err(LoginError::InvalidCredentials { attempts: 3, lock_minutes: Some(5) }));
    assert_eq!(h.storage.login_attempt_count(), 1);
}

#[tokio::test]
async fn identities_are_throttled_independently() {
    let h = harness();
    for _ in 0..3 {
        let _ = h.service.login(EMAIL, "wrong").await;
    }

    let result = h.service.login("bob@example.com", "wrong").await;
    assert_eq!(result, Err(LoginError::InvalidCredentials { attempts: 1, lock_minutes: None }));
}

#[tokio::test]
async fn storage_failure_closes_the_gate() {
    let h = harness_with(ChaoticStorage::new(MemoryStorage::new(), 1.0));

    let result = h.service.login(EMAIL, PASSWORD).await;

    assert!(matches!(result, Err(LoginError::Storage(StorageError::Io(_)))));
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn login_and_logout_clear_master_key() {
    let h = harness();

    h.keys.get().await.unwrap();
    h.service.login(EMAIL, PASSWORD).await.unwrap();
    assert!(!h.keys.is_cached());

    h.keys.get().await.unwrap();
    h.service.logout().await.unwrap();
    assert!(!h.keys.is_cached());
}

#[tokio::test]
async fn concurrent_failures_all_count() {
    let h = Arc::new(harness());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.service.login(EMAIL, "wrong").await })
        })
        .collect();

    let mut counted = 0;
    for task in tasks {
        if matches!(task.await.unwrap(), Err(LoginError::InvalidCredentials { .. })) {
            counted += 1;
        }
    }

    let record = h.storage.load_login_attempts(EMAIL).unwrap().unwrap();
    assert_eq!(record.attempts, counted);
}
