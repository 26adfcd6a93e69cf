//! Persisted domain records.

use serde::{Deserialize, Serialize};
use strongbox_crypto::WrappedKey;

/// A registered employee.
///
/// Every employee is a potential recipient; the directory is small enough to
/// list in full when sending to everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Stable identifier assigned by the identity provider
    pub id: String,
    /// Display name
    pub name: String,
    /// Login email, unique across the directory
    pub email: String,
}

/// One recipient's view of a shared file.
///
/// Sending to N recipients creates N records that all point at the same blob
/// and carry the same wrapped key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFileRecord {
    /// Record identifier
    pub id: u64,
    /// Original file name as chosen by the sender
    pub file_name: String,
    /// Object storage path of the encrypted blob
    pub storage_path: String,
    /// Sender's employee id
    pub sender_id: String,
    /// Sender's display name at send time
    pub sender_name: String,
    /// Recipient's employee id
    pub recipient_id: String,
    /// Recipient's display name at send time
    pub recipient_name: String,
    /// File key wrapped under the master key
    pub wrapped_key: WrappedKey,
    /// Send time, milliseconds since the Unix epoch
    pub created_at_ms: u64,
}

/// Audit entry for a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSuccess {
    /// Identity (email) that logged in
    pub identity: String,
    /// Login time, milliseconds since the Unix epoch
    pub login_time_ms: u64,
}
