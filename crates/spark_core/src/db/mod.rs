//! SQLite file bootstrap for the key-value task storage.
//!
//! # Responsibility
//! - Open and configure the SQLite file holding `kv_entries`.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Storage code must not read/write entries before migrations succeed.
//! - Entry-level failures carry the kv key they were touching.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Connection-level failure (open, pragma, transaction).
    Sqlite(rusqlite::Error),
    /// Reading or writing one `kv_entries` row failed.
    Entry {
        key: String,
        source: rusqlite::Error,
    },
    /// File was written by a binary with newer migrations.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection was handed over without running migrations first.
    SchemaNotMigrated { db_version: u32, required: u32 },
}

impl DbError {
    pub(crate) fn entry(key: &str, source: rusqlite::Error) -> Self {
        Self::Entry {
            key: key.to_string(),
            source,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Entry { key, source } => write!(f, "kv entry `{key}`: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaNotMigrated {
                db_version,
                required,
            } => write!(
                f,
                "kv storage requires schema version {required}, database is at {db_version}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Entry { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::SchemaNotMigrated { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn entry_error_names_the_key() {
        let err = DbError::entry("spark-storage", rusqlite::Error::QueryReturnedNoRows);
        assert!(err.to_string().starts_with("kv entry `spark-storage`"));
        assert!(err.source().is_some());
    }

    #[test]
    fn schema_not_migrated_reports_both_versions() {
        let err = DbError::SchemaNotMigrated {
            db_version: 0,
            required: 1,
        };
        assert_eq!(
            err.to_string(),
            "kv storage requires schema version 1, database is at 0"
        );
    }
}
