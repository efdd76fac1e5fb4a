//! Full-collection JSON dump.
//!
//! # Responsibility
//! - Serialize every task, including frozen, completed and archived ones.
//! - Name dump files after the export date.
//!
//! # Invariants
//! - Export never filters; it is the one place hidden tasks become visible.

use crate::model::task::TaskNode;
use chrono::{NaiveDate, Utc};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DUMP_FILE_PREFIX: &str = "dump_";

/// Errors from dump generation.
#[derive(Debug)]
pub enum ExportError {
    Serialization(serde_json::Error),
    Io(std::io::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(err) => write!(f, "failed to serialize tasks: {err}"),
            Self::Io(err) => write!(f, "failed to write dump: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialization(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Pretty-printed JSON array of the whole collection.
pub fn export_dump(tasks: &[TaskNode]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// `dump_<YYYY-MM-DD>.json`.
pub fn dump_file_name(date: NaiveDate) -> String {
    format!("{DUMP_FILE_PREFIX}{}.json", date.format("%Y-%m-%d"))
}

/// Today's dump file name, using the UTC calendar date.
pub fn dump_file_name_today() -> String {
    dump_file_name(Utc::now().date_naive())
}

/// Writes the dump into `dir` and returns the written path.
///
/// An existing file with the same name is overwritten.
pub fn write_dump(
    dir: &Path,
    tasks: &[TaskNode],
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(dump_file_name(date));
    let result = export_dump(tasks).and_then(|body| {
        std::fs::write(&path, body)?;
        Ok(())
    });

    match result {
        Ok(()) => {
            info!("event=export_dump module=export status=ok count={}", tasks.len());
            Ok(path)
        }
        Err(err) => {
            error!("event=export_dump module=export status=error error={err}");
            Err(err)
        }
    }
}
