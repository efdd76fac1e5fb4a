//! Store configuration.
//!
//! # Invariants
//! - `storage_key` is never empty; blank overrides fall back to the default.
//! - `heat_window_days` is at least one day.

use crate::storage::STORAGE_KEY;
use std::path::PathBuf;

/// Environment variable overriding the store database path.
pub const DB_PATH_ENV: &str = "SPARK_DB_PATH";

const DEFAULT_DB_FILE_NAME: &str = "spark_store.sqlite3";
const DEFAULT_HEAT_WINDOW_DAYS: u32 = 28;

/// Settings used to open a store and size its derived views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file backing the key-value storage.
    pub db_path: PathBuf,
    /// Namespaced key the task document is stored under.
    pub storage_key: String,
    /// Number of days rendered by the heat map.
    pub heat_window_days: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            storage_key: STORAGE_KEY.to_string(),
            heat_window_days: DEFAULT_HEAT_WINDOW_DAYS,
        }
    }
}

impl StoreConfig {
    /// Builds defaults, honoring `SPARK_DB_PATH` when it is set and non-blank.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(DB_PATH_ENV) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.db_path = PathBuf::from(trimmed);
            }
        }
        config
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.storage_key = key;
        }
        self
    }

    pub fn with_heat_window_days(mut self, days: u32) -> Self {
        self.heat_window_days = days.max(1);
        self
    }
}
