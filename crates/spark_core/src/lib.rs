//! Core domain logic for Spark, a chain-based personal task flow.
//! This crate is the single source of truth for task invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod derive;
pub mod export;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use derive::chain::{
    children_of, flow_view, frozen_tasks, is_chain_active, parent_chain_terminates, root_tasks,
    ChainIndex, ChainView,
};
pub use derive::heat::{
    completed_today, current_streak, daily_completions, day_bucket, flame_summary,
    flame_summary_now, heat_window, week_columns, DayBucket, FlameSummary, FlowPhase,
};
pub use export::{dump_file_name, dump_file_name_today, export_dump, write_dump, ExportError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{TaskFeeling, TaskId, TaskNode, TaskStatus};
pub use service::task_store::{MutationOutcome, TaskStore};
pub use storage::{
    decode_document, DecodedDocument, MemoryStorage, SqliteKvStorage, StorageError, StorageResult,
    TaskStorage, BACKUP_KEY_SUFFIX, STORAGE_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
