//! Encrypted file sharing between employees.
//!
//! A send encrypts the file once, uploads one blob, and writes one metadata
//! record per recipient. Every record carries the same storage path and the
//! same wrapped key, so any recipient holding the company passphrase can open
//! it.
//!
//! # Send Order
//!
//! ```text
//! resolve recipients ─▶ encrypt ─▶ upload blob ─▶ insert records
//!                                       ▲               │ fails
//!                                       └── remove ◀────┘
//! ```
//!
//! Recipients are resolved first so an empty selection never prompts for the
//! passphrase or leaves a blob behind.

use std::{collections::HashSet, sync::Arc};

use strongbox_core::{
    Employee, EncryptedFileRecord, EnvelopeCipher, EnvelopeError, Environment, PassphraseSource,
};
use thiserror::Error;

use crate::{
    identity::{Identity, IdentityProvider},
    objects::{ObjectStore, ObjectStoreError},
    storage::{FileRecordFilter, Storage, StorageError},
};

/// Who receives a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// Every employee in the directory, including the sender
    All,
    /// These employee ids
    ///
    /// Duplicates collapse to one record. Unknown ids are skipped.
    Selected(Vec<String>),
}

/// Files visible to the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    /// Records addressed to the user, newest first
    pub received: Vec<EncryptedFileRecord>,
    /// Records the user sent, newest first
    pub sent: Vec<EncryptedFileRecord>,
}

/// Errors from [`FileSharing`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharingError {
    /// No employee is signed in
    #[error("not signed in")]
    NotSignedIn,

    /// The signed-in identity has no directory entry
    #[error("signed-in user {id} is not in the employee directory")]
    UnknownSender {
        /// Identity provider id
        id: String,
    },

    /// The recipient selection resolved to nobody
    #[error("no recipients selected")]
    NoRecipients,

    /// The file name is empty after trimming
    #[error("file name is empty")]
    EmptyFileName,

    /// The file name has no usable final component
    #[error("file name {name:?} does not name a file")]
    InvalidFileName {
        /// Name as supplied, trimmed
        name: String,
    },

    /// The record does not exist, or the signed-in user is neither its
    /// sender nor its recipient
    #[error("record {record_id} is not addressed to the current user")]
    NotParticipant {
        /// Record that was requested
        record_id: u64,
    },

    /// Encryption or decryption failed
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Metadata storage failed
    #[error("metadata storage: {0}")]
    Storage(#[from] StorageError),

    /// Blob storage failed
    #[error("object storage: {0}")]
    Objects(#[from] ObjectStoreError),
}

impl SharingError {
    /// Returns true if the company passphrase must be entered again.
    ///
    /// The cipher has already cleared the cached key when this is true.
    pub fn requires_key_reset(&self) -> bool {
        matches!(self, Self::Envelope(e) if e.requires_key_reset())
    }
}

/// Send, list, and download encrypted files for the signed-in employee.
pub struct FileSharing<E, S, O, I, P> {
    env: E,
    storage: S,
    objects: O,
    identity: Arc<I>,
    cipher: EnvelopeCipher<E, P>,
}

impl<E, S, O, I, P> FileSharing<E, S, O, I, P>
where
    E: Environment,
    S: Storage,
    O: ObjectStore,
    I: IdentityProvider,
    P: PassphraseSource,
{
    /// Create a sharing service.
    pub fn new(
        env: E,
        storage: S,
        objects: O,
        identity: Arc<I>,
        cipher: EnvelopeCipher<E, P>,
    ) -> Self {
        Self { env, storage, objects, identity, cipher }
    }

    /// Encrypt `contents` and share it.
    ///
    /// Only the final path component of `file_name` is kept, so a recipient
    /// saving the file under its shared name cannot be steered into another
    /// directory.
    ///
    /// Returns the number of records written (one per recipient).
    ///
    /// # Errors
    ///
    /// - `NotSignedIn` / `UnknownSender`: no usable sender
    /// - `EmptyFileName`, `InvalidFileName`: no usable name
    /// - `NoRecipients`: the selection resolved to nobody
    /// - `Envelope`: passphrase cancelled or encryption failed; nothing stored
    /// - `Objects`: upload failed; nothing stored
    /// - `Storage`: records could not be written; the blob was removed
    pub async fn send_file(
        &self,
        file_name: &str,
        contents: &[u8],
        recipients: &Recipients,
    ) -> Result<usize, SharingError> {
        let sender = self.sender().await?;

        let file_name = shared_file_name(file_name)?;

        let recipients = self.resolve(recipients)?;
        if recipients.is_empty() {
            return Err(SharingError::NoRecipients);
        }

        let payload = self.cipher.encrypt(contents).await?;

        let created_at_ms = self.env.wall_clock_millis();
        let storage_path = format!("{created_at_ms}_{}", sanitize_file_name(file_name));
        self.objects.upload(&storage_path, payload.sealed.to_blob()).await?;

        let records: Vec<_> = recipients
            .iter()
            .map(|recipient| EncryptedFileRecord {
                id: self.env.random_u64(),
                file_name: file_name.to_string(),
                storage_path: storage_path.clone(),
                sender_id: sender.id.clone(),
                sender_name: sender.name.clone(),
                recipient_id: recipient.id.clone(),
                recipient_name: recipient.name.clone(),
                wrapped_key: payload.wrapped_key.clone(),
                created_at_ms,
            })
            .collect();

        if let Err(e) = self.storage.insert_file_records(&records) {
            tracing::warn!(path = %storage_path, error = %e, "Record insert failed, removing blob");
            if let Err(remove_err) = self.objects.remove(&storage_path).await {
                tracing::error!(
                    path = %storage_path,
                    error = %remove_err,
                    "Failed to remove orphaned blob"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            path = %storage_path,
            sender = %sender.id,
            recipients = records.len(),
            bytes = contents.len(),
            "File shared"
        );

        Ok(records.len())
    }

    /// Files received and sent by the signed-in employee.
    pub async fn list_files(&self) -> Result<FileListing, SharingError> {
        let user = self.current_user().await?;

        let received =
            self.storage.list_file_records(&FileRecordFilter::ReceivedBy(user.id.clone()))?;
        let sent = self.storage.list_file_records(&FileRecordFilter::SentBy(user.id))?;

        Ok(FileListing { received, sent })
    }

    /// Fetch and decrypt a shared file.
    ///
    /// The record is loaded from metadata storage by id, so access is decided
    /// by what was stored at send time.
    ///
    /// # Errors
    ///
    /// - `NotParticipant`: no such record, or it belongs to other employees
    /// - `Objects`: the blob is missing
    /// - `Envelope(WrongPassphraseOrCorrupted)`: wrong passphrase or damaged
    ///   blob; the cached master key has been cleared
    pub async fn download_file(&self, record_id: u64) -> Result<Vec<u8>, SharingError> {
        let user = self.current_user().await?;
        let record = self
            .storage
            .load_file_record(record_id)?
            .filter(|r| r.recipient_id == user.id || r.sender_id == user.id)
            .ok_or(SharingError::NotParticipant { record_id })?;

        let blob = self.objects.download(&record.storage_path).await?;

        match self.cipher.decrypt_blob(&blob, &record.wrapped_key).await {
            Ok(plaintext) => {
                tracing::debug!(record_id = record.id, "File decrypted");
                Ok(plaintext)
            },
            Err(e) => {
                tracing::warn!(
                    record_id = record.id,
                    path = %record.storage_path,
                    error = %e,
                    "File decryption failed"
                );
                Err(e.into())
            },
        }
    }

    async fn current_user(&self) -> Result<Identity, SharingError> {
        self.identity.current_user().await.ok_or(SharingError::NotSignedIn)
    }

    async fn sender(&self) -> Result<Employee, SharingError> {
        let user = self.current_user().await?;
        self.storage.load_employee(&user.id)?.ok_or(SharingError::UnknownSender { id: user.id })
    }

    fn resolve(&self, recipients: &Recipients) -> Result<Vec<Employee>, SharingError> {
        match recipients {
            Recipients::All => Ok(self.storage.list_employees()?),
            Recipients::Selected(ids) => {
                let mut seen = HashSet::new();
                let mut resolved = Vec::new();

                for id in ids.iter().filter(|id| seen.insert(*id)) {
                    match self.storage.load_employee(id)? {
                        Some(employee) => resolved.push(employee),
                        None => tracing::warn!(employee_id = %id, "Skipping unknown recipient"),
                    }
                }

                Ok(resolved)
            },
        }
    }
}

/// Reduce a user-supplied name to its final path component.
///
/// Both `/` and `\` count as separators. A name ending in a separator, or
/// whose last component is `.` or `..`, is rejected.
fn shared_file_name(name: &str) -> Result<&str, SharingError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SharingError::EmptyFileName);
    }

    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(SharingError::InvalidFileName { name: name.to_string() });
    }

    Ok(base)
}

/// Make a user-supplied name safe as a single object path component.
///
/// Separators and control characters become `_`. The upload path always
/// carries a timestamp prefix, so dots alone are harmless.
fn sanitize_file_name(name: &str) -> String {
    name.chars().map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c }).collect()
}
