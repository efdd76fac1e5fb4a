//! SQLite-backed key-value storage.
//!
//! # Responsibility
//! - Persist the task document as one row of the `kv_entries` table.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - Connections must be migrated to the latest schema before use.
//! - Each save replaces the whole document in a single statement.

use super::{
    decode_for_load, encode_document, StorageResult, TaskStorage, BACKUP_KEY_SUFFIX, STORAGE_KEY,
};
use crate::config::StoreConfig;
use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::task::TaskNode;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Task storage over a SQLite `kv_entries` table.
pub struct SqliteKvStorage {
    conn: Connection,
    key: String,
}

impl SqliteKvStorage {
    /// Opens (and migrates) a database file using the default storage key.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::try_new(open_db(path)?, STORAGE_KEY)
    }

    /// Opens the database file and key named by `config`.
    pub fn from_config(config: &StoreConfig) -> StorageResult<Self> {
        Self::try_new(open_db(&config.db_path)?, config.storage_key.as_str())
    }

    /// Opens an in-memory database using the default storage key.
    pub fn in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?, STORAGE_KEY)
    }

    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `DbError::SchemaNotMigrated` when the connection schema is not at the
    ///   latest migration version.
    pub fn try_new(conn: Connection, key: impl Into<String>) -> StorageResult<Self> {
        let required = latest_version();
        let db_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if db_version != required {
            return Err(DbError::SchemaNotMigrated {
                db_version,
                required,
            }
            .into());
        }
        Ok(Self {
            conn,
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Reads the raw value stored under this storage's key.
    pub fn raw_entry(&self) -> StorageResult<Option<String>> {
        self.read(self.key.as_str())
    }

    /// Overwrites the raw value stored under this storage's key.
    pub fn put_raw_entry(&self, value: &str) -> StorageResult<()> {
        self.upsert(self.key.as_str(), value)
    }

    /// Key holding the last partially readable document.
    pub fn backup_key(&self) -> String {
        format!("{}{BACKUP_KEY_SUFFIX}", self.key)
    }

    /// Reads the document saved aside when a load dropped records.
    pub fn backup_entry(&self) -> StorageResult<Option<String>> {
        self.read(&self.backup_key())
    }

    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|err| DbError::entry(key, err))?;
        Ok(value)
    }

    fn upsert(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )
        .map_err(|err| DbError::entry(key, err))?;
        Ok(())
    }

    /// Removes the stored document, if any.
    pub fn clear(&self) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [self.key.as_str()])
            .map_err(|err| DbError::entry(&self.key, err))?;
        Ok(())
    }
}

impl TaskStorage for SqliteKvStorage {
    fn load(&self) -> StorageResult<Option<Vec<TaskNode>>> {
        match self.raw_entry()? {
            Some(raw) => decode_for_load(&raw, |original| {
                self.upsert(&self.backup_key(), original)
            })
            .map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, tasks: &[TaskNode]) -> StorageResult<()> {
        let encoded = encode_document(tasks)?;
        self.put_raw_entry(&encoded)
    }
}
