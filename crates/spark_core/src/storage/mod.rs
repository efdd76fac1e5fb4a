//! Durable storage contract for the task collection.
//!
//! # Responsibility
//! - Define the load/save contract the task store writes through to.
//! - Own the persisted document layout shared by all backends.
//!
//! # Invariants
//! - The whole collection is persisted as one JSON document under a single
//!   namespaced key: `{ "state": { "tasks": [...] }, "version": N }`.
//! - Documents written by a newer schema version are rejected, never guessed.
//! - A record that fails to decode is skipped, not fatal; the raw document is
//!   copied to the backup key before the collection can be rewritten.

use crate::db::DbError;
use crate::model::task::TaskNode;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite_kv;

pub use memory::MemoryStorage;
pub use sqlite_kv::SqliteKvStorage;

/// Namespaced key the task document is stored under.
pub const STORAGE_KEY: &str = "spark-storage";

/// Suffix of the key holding the last partially readable document.
pub const BACKUP_KEY_SUFFIX: &str = ":backup";

/// Document version written by this binary.
pub const PERSIST_VERSION: u32 = 0;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends.
///
/// The store never surfaces these to its callers; they are logged and the
/// session continues in memory.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Document could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// Document was written by a newer schema.
    UnsupportedVersion { found: u32, supported: u32 },
    /// Backend is not usable (poisoned lock, schema mismatch, ...).
    Unavailable(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "invalid task document: {err}"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "task document version {found} is newer than supported {supported}"
            ),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::UnsupportedVersion { .. } => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Key-value durable storage the task store writes through to.
pub trait TaskStorage: Send {
    /// Loads the persisted collection. `Ok(None)` means nothing was stored yet.
    fn load(&self) -> StorageResult<Option<Vec<TaskNode>>>;
    /// Replaces the persisted collection.
    fn save(&self, tasks: &[TaskNode]) -> StorageResult<()>;
}

impl<S: TaskStorage + ?Sized> TaskStorage for Box<S> {
    fn load(&self) -> StorageResult<Option<Vec<TaskNode>>> {
        (**self).load()
    }

    fn save(&self, tasks: &[TaskNode]) -> StorageResult<()> {
        (**self).save(tasks)
    }
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    state: StateOut<'a>,
    version: u32,
}

#[derive(Serialize)]
struct StateOut<'a> {
    tasks: &'a [TaskNode],
}

#[derive(Deserialize)]
struct DocumentIn {
    state: StateIn,
    #[serde(default)]
    version: u32,
}

#[derive(Deserialize)]
struct StateIn {
    #[serde(default)]
    tasks: Vec<serde_json::Value>,
}

/// Result of decoding one persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    pub tasks: Vec<TaskNode>,
    /// Records dropped because they did not decode as a task.
    pub skipped: usize,
}

/// Encodes the collection into the persisted document layout.
pub fn encode_document(tasks: &[TaskNode]) -> StorageResult<String> {
    let document = DocumentOut {
        state: StateOut { tasks },
        version: PERSIST_VERSION,
    };
    Ok(serde_json::to_string(&document)?)
}

/// Decodes a persisted document back into the collection.
///
/// Unknown fields inside `state` are ignored, so documents carrying extra UI
/// state still load. Each task record decodes on its own; invalid ones are
/// logged by index and counted in `skipped`.
pub fn decode_document(raw: &str) -> StorageResult<DecodedDocument> {
    let document: DocumentIn = serde_json::from_str(raw)?;
    if document.version > PERSIST_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: document.version,
            supported: PERSIST_VERSION,
        });
    }

    let mut decoded = DecodedDocument {
        tasks: Vec::with_capacity(document.state.tasks.len()),
        skipped: 0,
    };
    for (index, record) in document.state.tasks.into_iter().enumerate() {
        match serde_json::from_value::<TaskNode>(record) {
            Ok(task) => decoded.tasks.push(task),
            Err(_) => {
                warn!(
                    "event=storage_decode module=storage status=skip reason=invalid_record index={index}"
                );
                decoded.skipped += 1;
            }
        }
    }
    Ok(decoded)
}

/// Decodes `raw` for a load, handing it to `backup` first when any record
/// was dropped.
fn decode_for_load(
    raw: &str,
    backup: impl FnOnce(&str) -> StorageResult<()>,
) -> StorageResult<Vec<TaskNode>> {
    let decoded = decode_document(raw)?;
    if decoded.skipped > 0 {
        backup(raw)?;
        warn!(
            "event=storage_decode module=storage status=partial skipped={} kept={} backup=written",
            decoded.skipped,
            decoded.tasks.len()
        );
    }
    Ok(decoded.tasks)
}

#[cfg(test)]
mod tests {
    use super::{
        decode_document, decode_for_load, encode_document, StorageError, PERSIST_VERSION,
    };
    use crate::model::task::{TaskId, TaskNode};

    #[test]
    fn encoded_document_uses_state_and_version_envelope() {
        let node = TaskNode::with_id(TaskId::from("t-1"), "draft", None, 42);
        let raw = encode_document(&[node]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], PERSIST_VERSION);
        assert_eq!(value["state"]["tasks"][0]["id"], "t-1");
        assert_eq!(value["state"]["tasks"][0]["createdAt"], 42);
    }

    #[test]
    fn decode_ignores_extra_ui_state() {
        let raw = r#"{
            "state": {
                "tasks": [],
                "activePopoverId": null,
                "isMobileInputOpen": false
            },
            "version": 0
        }"#;
        assert!(decode_document(raw).unwrap().tasks.is_empty());
    }

    #[test]
    fn decode_rejects_newer_document_version() {
        let raw = r#"{ "state": { "tasks": [] }, "version": 7 }"#;
        let err = decode_document(raw).unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 7, supported } if supported == PERSIST_VERSION
        ));
    }

    #[test]
    fn invalid_record_is_skipped_and_valid_one_kept() {
        let raw = r#"{
            "state": {
                "tasks": [
                    { "id": "ok", "content": "keep", "status": "active", "createdAt": 1 },
                    { "id": "bad", "content": "x", "status": "completed",
                      "feeling": "😀", "createdAt": 2, "completedAt": 3 }
                ]
            },
            "version": 0
        }"#;

        let decoded = decode_document(raw).unwrap();
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.tasks.len(), 1);
        assert_eq!(decoded.tasks[0].id.as_str(), "ok");
    }

    #[test]
    fn record_missing_created_at_is_skipped() {
        let raw = r#"{ "state": { "tasks": [ { "id": "a", "content": "", "status": "active" } ] }, "version": 0 }"#;
        let decoded = decode_document(raw).unwrap();
        assert!(decoded.tasks.is_empty());
        assert_eq!(decoded.skipped, 1);
    }

    #[test]
    fn partial_load_hands_raw_document_to_backup() {
        let raw = r#"{ "state": { "tasks": [ { "id": "a", "status": "paused" } ] }, "version": 0 }"#;
        let mut backed_up = None;

        let tasks = decode_for_load(raw, |original| {
            backed_up = Some(original.to_string());
            Ok(())
        })
        .unwrap();

        assert!(tasks.is_empty());
        assert_eq!(backed_up.as_deref(), Some(raw));
    }

    #[test]
    fn clean_load_skips_backup() {
        let raw = r#"{ "state": { "tasks": [] }, "version": 0 }"#;
        let tasks = decode_for_load(raw, |_| panic!("no backup expected")).unwrap();
        assert!(tasks.is_empty());
    }
}
