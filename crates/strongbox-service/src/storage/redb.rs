//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Every
//! mutation is one write transaction, so a batch of file records or an
//! attempt-counter update is either fully visible or not at all.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};
use strongbox_core::{Employee, EncryptedFileRecord, LoginAttemptRecord, LoginSuccess};

use super::{FileRecordFilter, Storage, StorageError};

/// Table: login_attempts
/// Key: identity (email)
/// Value: CBOR-encoded LoginAttemptRecord
const LOGIN_ATTEMPTS: TableDefinition<&str, &[u8]> = TableDefinition::new("login_attempts");

/// Table: login_successes
/// Key: append sequence number
/// Value: CBOR-encoded LoginSuccess
const LOGIN_SUCCESSES: TableDefinition<u64, &[u8]> = TableDefinition::new("login_successes");

/// Table: employees
/// Key: employee id
/// Value: CBOR-encoded Employee
const EMPLOYEES: TableDefinition<&str, &[u8]> = TableDefinition::new("employees");

/// Table: credentials
/// Key: employee id
/// Value: Argon2 PHC string
const CREDENTIALS: TableDefinition<&str, &str> = TableDefinition::new("credentials");

/// Table: file_records
/// Key: (created_at_ms: u64, id: u64) as big-endian bytes [16 bytes]
/// Value: CBOR-encoded EncryptedFileRecord
const FILE_RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("file_records");

/// Table: file_record_ids
/// Key: record id
/// Value: FILE_RECORDS key [16 bytes]
const FILE_RECORD_IDS: TableDefinition<u64, &[u8]> = TableDefinition::new("file_record_ids");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(LOGIN_ATTEMPTS).map_err(io)?;
            let _ = txn.open_table(LOGIN_SUCCESSES).map_err(io)?;
            let _ = txn.open_table(EMPLOYEES).map_err(io)?;
            let _ = txn.open_table(CREDENTIALS).map_err(io)?;
            let _ = txn.open_table(FILE_RECORDS).map_err(io)?;
            let _ = txn.open_table(FILE_RECORD_IDS).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn load_login_attempts(
        &self,
        identity: &str,
    ) -> Result<Option<LoginAttemptRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(LOGIN_ATTEMPTS).map_err(io)?;

        match table.get(identity).map_err(io)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn update_login_attempts<F>(
        &self,
        identity: &str,
        update: F,
    ) -> Result<LoginAttemptRecord, StorageError>
    where
        F: FnOnce(Option<&LoginAttemptRecord>) -> LoginAttemptRecord,
    {
        let txn = self.db.begin_write().map_err(io)?;

        let record = {
            let mut table = txn.open_table(LOGIN_ATTEMPTS).map_err(io)?;

            let current: Option<LoginAttemptRecord> = match table.get(identity).map_err(io)? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };

            let record = update(current.as_ref());
            let bytes = encode(&record)?;
            table.insert(identity, bytes.as_slice()).map_err(io)?;
            record
        };

        txn.commit().map_err(io)?;

        Ok(record)
    }

    fn delete_login_attempts(&self, identity: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(LOGIN_ATTEMPTS).map_err(io)?;
            table.remove(identity).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn append_login_success(&self, entry: &LoginSuccess) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(LOGIN_SUCCESSES).map_err(io)?;

            let next = match table.last().map_err(io)? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };

            let bytes = encode(entry)?;
            table.insert(next, bytes.as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn login_successes(&self, identity: &str) -> Result<Vec<LoginSuccess>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(LOGIN_SUCCESSES).map_err(io)?;

        let mut entries = Vec::new();
        for result in table.iter().map_err(io)? {
            let (_, value) = result.map_err(io)?;
            let entry: LoginSuccess = decode(value.value())?;
            if entry.identity == identity {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    fn upsert_employee(&self, employee: &Employee) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(EMPLOYEES).map_err(io)?;
            let bytes = encode(employee)?;
            table.insert(employee.id.as_str(), bytes.as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_employee(&self, id: &str) -> Result<Option<Employee>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(EMPLOYEES).map_err(io)?;

        match table.get(id).map_err(io)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_employee_by_email(&self, email: &str) -> Result<Option<Employee>, StorageError> {
        Ok(self.list_employees()?.into_iter().find(|e| e.email == email))
    }

    fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(EMPLOYEES).map_err(io)?;

        let mut employees = Vec::new();
        for result in table.iter().map_err(io)? {
            let (_, value) = result.map_err(io)?;
            employees.push(decode(value.value())?);
        }

        Ok(employees)
    }

    fn store_credential(&self, employee_id: &str, password_hash: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(CREDENTIALS).map_err(io)?;
            table.insert(employee_id, password_hash).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_credential(&self, employee_id: &str) -> Result<Option<String>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(CREDENTIALS).map_err(io)?;

        Ok(table.get(employee_id).map_err(io)?.map(|value| value.value().to_string()))
    }

    fn insert_file_records(&self, records: &[EncryptedFileRecord]) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut records_table = txn.open_table(FILE_RECORDS).map_err(io)?;
            let mut ids_table = txn.open_table(FILE_RECORD_IDS).map_err(io)?;

            for record in records {
                // Returning before commit aborts the transaction, so earlier
                // records in the batch are discarded too
                if ids_table.get(record.id).map_err(io)?.is_some() {
                    return Err(StorageError::Conflict { id: record.id });
                }

                let key = encode_record_key(record.created_at_ms, record.id);
                let bytes = encode(record)?;
                records_table.insert(key.as_slice(), bytes.as_slice()).map_err(io)?;
                ids_table.insert(record.id, key.as_slice()).map_err(io)?;
            }
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_file_record(&self, id: u64) -> Result<Option<EncryptedFileRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let ids_table = txn.open_table(FILE_RECORD_IDS).map_err(io)?;
        let Some(key) = ids_table.get(id).map_err(io)? else {
            return Ok(None);
        };

        let records_table = txn.open_table(FILE_RECORDS).map_err(io)?;
        match records_table.get(key.value()).map_err(io)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Err(StorageError::Io(format!("file record {id} has a dangling index entry"))),
        }
    }

    fn list_file_records(
        &self,
        filter: &FileRecordFilter,
    ) -> Result<Vec<EncryptedFileRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(FILE_RECORDS).map_err(io)?;

        // Keys sort by (created_at_ms, id), so reverse order is newest first
        let mut records = Vec::new();
        for result in table.iter().map_err(io)?.rev() {
            let (_, value) = result.map_err(io)?;
            let record: EncryptedFileRecord = decode(value.value())?;
            if filter.matches(&record) {
                records.push(record);
            }
        }

        Ok(records)
    }
}

/// Encode (created_at_ms, id) as 16-byte big-endian key.
///
/// Layout: [created_at_ms: 8 bytes BE][id: 8 bytes BE]
/// This ensures lexicographic ordering matches time ordering.
fn encode_record_key(created_at_ms: u64, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&created_at_ms.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn io(err: impl std::fmt::Display) -> StorageError {
    StorageError::Io(err.to_string())
}
