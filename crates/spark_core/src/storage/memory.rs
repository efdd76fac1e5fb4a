//! In-memory storage backend.
//!
//! Holds the encoded document in a shared slot so a handle kept by the caller
//! observes exactly what the store last wrote.

use super::{decode_for_load, encode_document, StorageError, StorageResult, TaskStorage};
use crate::model::task::TaskNode;
use std::sync::{Arc, Mutex, MutexGuard};

/// Clonable in-memory storage. Clones share one document slot and one backup
/// slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
    backup: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-seeded with a raw document, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
            backup: Arc::default(),
        }
    }

    /// Returns the raw document last written, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Returns the partially readable document saved aside on load, if any.
    pub fn backup_raw(&self) -> Option<String> {
        self.backup.lock().ok().and_then(|slot| slot.clone())
    }
}

fn lock(slot: &Mutex<Option<String>>) -> StorageResult<MutexGuard<'_, Option<String>>> {
    slot.lock()
        .map_err(|_| StorageError::Unavailable("memory slot lock poisoned".to_string()))
}

impl TaskStorage for MemoryStorage {
    fn load(&self) -> StorageResult<Option<Vec<TaskNode>>> {
        let Some(raw) = lock(&self.slot)?.clone() else {
            return Ok(None);
        };
        decode_for_load(&raw, |original| {
            *lock(&self.backup)? = Some(original.to_string());
            Ok(())
        })
        .map(Some)
    }

    fn save(&self, tasks: &[TaskNode]) -> StorageResult<()> {
        let encoded = encode_document(tasks)?;
        *lock(&self.slot)? = Some(encoded);
        Ok(())
    }
}
