//! File sharing tests
//!
//! Several employees share one metadata store and one blob store, each with
//! their own session and key cache, the way separate browser sessions would.

#![allow(clippy::disallowed_types, reason = "Test passphrase script")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use strongbox_core::{
    Employee, EncryptedFileRecord, EnvelopeError, FixedPassphrase, LockoutPolicy,
    LoginAttemptRecord, LoginSuccess, MasterKeyProvider, PassphraseSource,
    env::test_utils::MockEnv,
};
use strongbox_crypto::KdfParams;
use strongbox_service::{
    FileRecordFilter, LocalDirectory, MemoryObjectStore, MemoryStorage, ObjectStore,
    ObjectStoreError, PasswordHashing, Recipients, Session, SharingError, Storage, StorageError,
};
use zeroize::Zeroizing;

const PASSWORD: &str = "employee-password";
const COMPANY: &str = "company passphrase";

type TestSession<S, P> = Session<MockEnv, S, MemoryObjectStore, LocalDirectory<S, MockEnv>, P>;

/// Answers prompts from a fixed script, then cancels.
struct ScriptedPassphrase {
    answers: Mutex<VecDeque<&'static str>>,
}

impl ScriptedPassphrase {
    fn new(answers: &[&'static str]) -> Self {
        Self { answers: Mutex::new(answers.iter().copied().collect()) }
    }
}

impl PassphraseSource for ScriptedPassphrase {
    async fn request_passphrase(&self) -> Option<Zeroizing<String>> {
        let next = self.answers.lock().unwrap().pop_front();
        next.map(|answer| Zeroizing::new(answer.to_string()))
    }
}

/// Storage whose record inserts always fail.
#[derive(Clone)]
struct RejectInserts(MemoryStorage);

impl Storage for RejectInserts {
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

    fn delete_login_attempts(&self, identity: &str) -> Result<(), StorageError> {
        self.0.delete_login_attempts(identity)
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

    fn insert_file_records(&self, _records: &[EncryptedFileRecord]) -> Result<(), StorageError> {
        Err(StorageError::Io("insert rejected".to_string()))
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

struct Office<S: Storage> {
    env: MockEnv,
    storage: S,
    objects: MemoryObjectStore,
    alice: Employee,
    bob: Employee,
    carol: Employee,
}

impl<S: Storage> Office<S> {
    fn new(storage: S) -> Self {
        let env = MockEnv::default();
        let directory = directory(&storage, &env);

        let alice = directory.register("Alice", "alice@example.com", PASSWORD).unwrap();
        let bob = directory.register("Bob", "bob@example.com", PASSWORD).unwrap();
        let carol = directory.register("Carol", "carol@example.com", PASSWORD).unwrap();

        Self { env, storage, objects: MemoryObjectStore::new(), alice, bob, carol }
    }

    async fn session_as<P: PassphraseSource>(
        &self,
        employee: &Employee,
        passphrase: P,
    ) -> TestSession<S, P> {
        let keys = MasterKeyProvider::with_params(passphrase, kdf());
        let session = Session::open(
            self.env.clone(),
            self.storage.clone(),
            self.objects.clone(),
            Arc::new(directory(&self.storage, &self.env)),
            Arc::new(keys),
            LockoutPolicy::default(),
        );

        session.login().login(&employee.email, PASSWORD).await.unwrap();
        session
    }
}

fn directory<S: Storage>(storage: &S, env: &MockEnv) -> LocalDirectory<S, MockEnv> {
    LocalDirectory::new(storage.clone(), env.clone(), PasswordHashing::insecure_fast()).unwrap()
}

fn kdf() -> KdfParams {
    KdfParams { salt: b"office-salt".to_vec(), iterations: 10 }
}

fn office() -> Office<MemoryStorage> {
    Office::new(MemoryStorage::new())
}

#[tokio::test]
async fn send_to_everyone_reaches_every_employee() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    let count =
        alice.sharing().send_file("plan.txt", b"quarterly plan", &Recipients::All).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(office.objects.len(), 1);
    assert_eq!(office.storage.file_record_count(), 3);

    let listing = alice.sharing().list_files().await.unwrap();
    assert_eq!(listing.sent.len(), 3);
    assert_eq!(listing.received.len(), 1);

    let first = &listing.sent[0];
    assert!(listing.sent.iter().all(|r| r.storage_path == first.storage_path));
    assert!(listing.sent.iter().all(|r| r.wrapped_key == first.wrapped_key));
    assert!(first.storage_path.ends_with("_plan.txt"));
}

#[tokio::test]
async fn recipient_downloads_with_own_session() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;
    let bob = office.session_as(&office.bob, FixedPassphrase::new(COMPANY)).await;

    let to_bob = Recipients::Selected(vec![office.bob.id.clone()]);
    alice.sharing().send_file("memo.txt", b"for bob only", &to_bob).await.unwrap();

    let listing = bob.sharing().list_files().await.unwrap();
    assert_eq!(listing.received.len(), 1);
    assert!(listing.sent.is_empty());

    let record = &listing.received[0];
    assert_eq!(record.sender_name, "Alice");
    assert_eq!(record.recipient_name, "Bob");

    let plaintext = bob.sharing().download_file(record.id).await.unwrap();
    assert_eq!(plaintext, b"for bob only");
}

#[tokio::test]
async fn selection_skips_unknown_and_duplicate_ids() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    let selection = Recipients::Selected(vec![
        office.carol.id.clone(),
        "no-such-employee".to_string(),
        office.carol.id.clone(),
    ]);
    let count = alice.sharing().send_file("a.txt", b"x", &selection).await.unwrap();

    assert_eq!(count, 1);
}

#[tokio::test]
async fn empty_selection_touches_nothing() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    let ghost = Recipients::Selected(vec!["ghost".to_string()]);
    for selection in [Recipients::Selected(vec![]), ghost] {
        let result = alice.sharing().send_file("a.txt", b"x", &selection).await;
        assert_eq!(result, Err(SharingError::NoRecipients));
    }

    assert!(office.objects.is_empty());
    assert_eq!(alice.keys().derivations_started(), 0);
}

#[tokio::test]
async fn blank_file_name_rejected() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    let result = alice.sharing().send_file("   ", b"x", &Recipients::All).await;
    assert_eq!(result, Err(SharingError::EmptyFileName));
}

#[tokio::test]
async fn shared_name_drops_directories() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;
    let bob = office.session_as(&office.bob, FixedPassphrase::new(COMPANY)).await;
    let to_bob = Recipients::Selected(vec![office.bob.id.clone()]);

    alice.sharing().send_file("../../.bashrc", b"1", &to_bob).await.unwrap();
    office.env.advance_millis(1);
    alice.sharing().send_file("/etc/cron.d/x", b"2", &to_bob).await.unwrap();

    let received = bob.sharing().list_files().await.unwrap().received;
    let names: Vec<_> = received.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, ["x", ".bashrc"]);
    assert!(received.iter().all(|r| !r.storage_path.contains('/')));

    for name in ["..", "dir/", "/etc/.."] {
        let result = alice.sharing().send_file(name, b"x", &to_bob).await;
        assert_eq!(result, Err(SharingError::InvalidFileName { name: name.to_string() }));
    }
    assert_eq!(office.objects.len(), 2);
}

#[tokio::test]
async fn signed_out_user_cannot_share() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;
    alice.login().logout().await.unwrap();

    let send = alice.sharing().send_file("a.txt", b"x", &Recipients::All).await;
    let list = alice.sharing().list_files().await;

    assert_eq!(send, Err(SharingError::NotSignedIn));
    assert_eq!(list, Err(SharingError::NotSignedIn));
}

#[tokio::test]
async fn cancelled_passphrase_uploads_nothing() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::cancelled()).await;

    let result = alice.sharing().send_file("a.txt", b"x", &Recipients::All).await;

    assert_eq!(result, Err(SharingError::Envelope(EnvelopeError::MissingPassphrase)));
    assert!(office.objects.is_empty());
    assert_eq!(office.storage.file_record_count(), 0);
}

#[tokio::test]
async fn wrong_passphrase_clears_key_and_next_attempt_prompts_again() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;
    let bob = office.session_as(&office.bob, ScriptedPassphrase::new(&["typo", COMPANY])).await;

    let to_bob = Recipients::Selected(vec![office.bob.id.clone()]);
    alice.sharing().send_file("memo.txt", b"secret", &to_bob).await.unwrap();
    let record = bob.sharing().list_files().await.unwrap().received.remove(0);

    let first = bob.sharing().download_file(record.id).await;
    assert_eq!(first, Err(SharingError::Envelope(EnvelopeError::WrongPassphraseOrCorrupted)));
    assert!(first.unwrap_err().requires_key_reset());
    assert!(!bob.keys().is_cached());

    let second = bob.sharing().download_file(record.id).await.unwrap();
    assert_eq!(second, b"secret");
    assert_eq!(bob.keys().derivations_started(), 2);
}

#[tokio::test]
async fn corrupted_blob_is_reported_not_decrypted() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    alice.sharing().send_file("a.txt", b"original bytes", &Recipients::All).await.unwrap();
    let record = alice.sharing().list_files().await.unwrap().received.remove(0);

    let mut blob = office.objects.download(&record.storage_path).await.unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0x80;
    office.objects.overwrite(&record.storage_path, blob);

    let result = alice.sharing().download_file(record.id).await;
    assert_eq!(result, Err(SharingError::Envelope(EnvelopeError::WrongPassphraseOrCorrupted)));
}

#[tokio::test]
async fn missing_blob_surfaces_not_found() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    alice.sharing().send_file("a.txt", b"x", &Recipients::All).await.unwrap();
    let record = alice.sharing().list_files().await.unwrap().received.remove(0);
    office.objects.remove(&record.storage_path).await.unwrap();

    let result = alice.sharing().download_file(record.id).await;
    assert!(matches!(result, Err(SharingError::Objects(ObjectStoreError::NotFound { .. }))));
}

#[tokio::test]
async fn outsider_cannot_download() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;
    let carol = office.session_as(&office.carol, FixedPassphrase::new(COMPANY)).await;

    let to_bob = Recipients::Selected(vec![office.bob.id.clone()]);
    alice.sharing().send_file("memo.txt", b"x", &to_bob).await.unwrap();
    let record = alice.sharing().list_files().await.unwrap().sent.remove(0);

    let result = carol.sharing().download_file(record.id).await;
    assert_eq!(result, Err(SharingError::NotParticipant { record_id: record.id }));
}

#[tokio::test]
async fn unknown_record_id_is_refused() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    alice.sharing().send_file("a.txt", b"x", &Recipients::All).await.unwrap();
    let known = alice.sharing().list_files().await.unwrap().received.remove(0);
    let unknown = known.id.wrapping_add(1);

    let result = alice.sharing().download_file(unknown).await;
    assert_eq!(result, Err(SharingError::NotParticipant { record_id: unknown }));
    assert_eq!(alice.keys().derivations_started(), 1);
}

#[tokio::test]
async fn failed_record_insert_removes_blob() {
    let office = Office::new(RejectInserts(MemoryStorage::new()));
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    let result = alice.sharing().send_file("a.txt", b"x", &Recipients::All).await;

    assert!(matches!(result, Err(SharingError::Storage(StorageError::Io(_)))));
    assert!(office.objects.is_empty());
}

#[tokio::test]
async fn listing_is_newest_first() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;
    let to_bob = Recipients::Selected(vec![office.bob.id.clone()]);

    alice.sharing().send_file("old.txt", b"1", &to_bob).await.unwrap();
    office.env.advance_millis(1_000);
    alice.sharing().send_file("new.txt", b"2", &to_bob).await.unwrap();

    let sent = alice.sharing().list_files().await.unwrap().sent;
    let names: Vec<_> = sent.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, ["new.txt", "old.txt"]);
}

#[tokio::test]
async fn one_prompt_for_many_sends() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    for i in 0..5 {
        office.env.advance_millis(1);
        alice.sharing().send_file(&format!("f{i}.txt"), b"x", &Recipients::All).await.unwrap();
    }

    assert_eq!(alice.keys().derivations_started(), 1);
}

#[tokio::test]
async fn closing_session_drops_key() {
    let office = office();
    let alice = office.session_as(&office.alice, FixedPassphrase::new(COMPANY)).await;

    alice.sharing().send_file("a.txt", b"x", &Recipients::All).await.unwrap();
    assert!(alice.keys().is_cached());

    alice.close();
    assert!(!alice.keys().is_cached());
}
