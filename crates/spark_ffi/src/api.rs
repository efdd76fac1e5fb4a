//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own the process-wide task store and serialize access to it.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call runs to completion under the store lock, so UI events are
//!   applied one at a time in arrival order.
//! - When the database cannot be opened the session runs from memory.

use chrono::Local;
use log::warn;
use spark_core::config::StoreConfig;
use spark_core::{
    core_version as core_version_inner, default_log_level, dump_file_name_today, export_dump, flame_summary,
    heat_window, init_logging as init_logging_inner, ping as ping_inner, ChainIndex, ChainView,
    MemoryStorage, MutationOutcome, SqliteKvStorage, TaskFeeling, TaskId, TaskNode,
    TaskStatus, TaskStorage, TaskStore,
};
use std::sync::{Mutex, OnceLock};

type SharedStore = TaskStore<Box<dyn TaskStorage>>;

static STORE_CONFIG: OnceLock<StoreConfig> = OnceLock::new();
static STORE: OnceLock<Mutex<SharedStore>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive); blank
///   selects the build default (`debug` or `info`).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = match level.trim() {
        "" => default_log_level(),
        explicit => explicit,
    };
    match init_logging_inner(level, log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One task as rendered by the flow or freezer column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub task_id: String,
    pub content: String,
    /// `active|completed|frozen`.
    pub status: String,
    pub parent_id: Option<String>,
    /// Feeling glyph, when recorded.
    pub feeling: Option<String>,
    pub reflection: Option<String>,
    pub created_at_ms: i64,
    pub completed_at_ms: Option<i64>,
    /// Nesting level inside its chain; 0 for chain heads and freezer items.
    pub depth: u32,
    /// Whether this node or a live descendant is still active.
    pub chain_active: bool,
}

/// List response envelope for flow and freezer views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    /// Tasks in display order (pre-order for the flow view).
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Generic action response envelope for mutation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether the request was accepted.
    pub ok: bool,
    /// Target or created task ID.
    pub task_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task_id: Option<String>) -> Self {
        Self {
            ok: true,
            task_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task_id: None,
            message: message.into(),
        }
    }

    fn from_outcome(op: &str, id: &TaskId, outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Applied => {
                Self::success(format!("{op} applied."), Some(id.to_string()))
            }
            MutationOutcome::Unchanged => {
                Self::success(format!("{op} left task unchanged."), Some(id.to_string()))
            }
            MutationOutcome::NotFound(missing) => {
                Self::failure(format!("{op} failed: task not found: {missing}"))
            }
        }
    }
}

/// Completions for one local day of the heat map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatDayItem {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub count: u32,
}

/// Flame column snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlameResponse {
    pub completed_today: u32,
    /// 0..=5.
    pub intensity: u8,
    /// `idle|warmup|optimal_flow|overclocking`.
    pub phase: String,
    pub streak_days: u32,
    /// Heat map window, oldest first.
    pub heat: Vec<HeatDayItem>,
}

/// Export response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    /// Suggested file name, `dump_<date>.json`.
    pub file_name: String,
    /// Pretty-printed JSON array of every task.
    pub body: String,
    pub message: String,
}

/// Adds a task; `parent_id` continues an existing chain.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Unknown `parent_id` starts a new chain instead of failing.
/// - `content` is stored verbatim, including surrounding whitespace.
#[flutter_rust_bridge::frb(sync)]
pub fn flow_add_task(content: String, parent_id: Option<String>) -> TaskActionResponse {
    let parent_id = normalize_id(parent_id);
    match with_store(|store| store.add_task(content, parent_id.as_ref())) {
        Ok(id) => TaskActionResponse::success("Task added.", Some(id.to_string())),
        Err(err) => TaskActionResponse::failure(format!("flow_add_task failed: {err}")),
    }
}

/// Completes a task with an optional feeling glyph (`😐|🙂|🤩`).
#[flutter_rust_bridge::frb(sync)]
pub fn flow_complete_task(task_id: String, feeling: Option<String>) -> TaskActionResponse {
    let feeling = match feeling.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        None => None,
        Some(raw) => match TaskFeeling::from_emoji(raw) {
            Some(feeling) => Some(feeling),
            None => {
                return TaskActionResponse::failure(format!(
                    "flow_complete_task failed: unsupported feeling `{raw}`"
                ))
            }
        },
    };
    run_mutation("complete", task_id, |store, id| {
        store.complete_task(id, feeling)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn flow_freeze_task(task_id: String) -> TaskActionResponse {
    run_mutation("freeze", task_id, |store, id| store.freeze_task(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn flow_unfreeze_task(task_id: String) -> TaskActionResponse {
    run_mutation("unfreeze", task_id, |store, id| store.unfreeze_task(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn flow_delete_task(task_id: String) -> TaskActionResponse {
    run_mutation("delete", task_id, |store, id| store.delete_task(id))
}

#[flutter_rust_bridge::frb(sync)]
pub fn flow_update_content(task_id: String, content: String) -> TaskActionResponse {
    run_mutation("update_content", task_id, |store, id| {
        store.update_task_content(id, content)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn flow_update_reflection(task_id: String, reflection: String) -> TaskActionResponse {
    run_mutation("update_reflection", task_id, |store, id| {
        store.update_task_reflection(id, reflection)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn flow_update_feeling(task_id: String, feeling: String) -> TaskActionResponse {
    let Some(feeling) = TaskFeeling::from_emoji(&feeling) else {
        return TaskActionResponse::failure(format!(
            "flow_update_feeling failed: unsupported feeling `{}`",
            feeling.trim()
        ));
    };
    run_mutation("update_feeling", task_id, |store, id| {
        store.update_task_feeling(id, feeling)
    })
}

/// Inserts an empty step below `task_id` and returns its ID.
#[flutter_rust_bridge::frb(sync)]
pub fn flow_split_task(task_id: String) -> TaskActionResponse {
    let id = TaskId::new(task_id.trim());
    match with_store(|store| store.split_task(&id)) {
        Ok(Some(new_id)) => TaskActionResponse::success("Task split.", Some(new_id.to_string())),
        Ok(None) => {
            TaskActionResponse::failure(format!("flow_split_task failed: task not found: {id}"))
        }
        Err(err) => TaskActionResponse::failure(format!("flow_split_task failed: {err}")),
    }
}

/// Archives every completed task.
#[flutter_rust_bridge::frb(sync)]
pub fn flow_archive_completed() -> TaskActionResponse {
    match with_store(SharedStore::archive_completed) {
        Ok(count) => TaskActionResponse::success(format!("Archived {count} task(s)."), None),
        Err(err) => TaskActionResponse::failure(format!("flow_archive_completed failed: {err}")),
    }
}

/// Flow column: chain heads in display order with descendants in pre-order.
#[flutter_rust_bridge::frb(sync)]
pub fn flow_list() -> TaskListResponse {
    let result = with_store(|store| {
        let index = ChainIndex::new(store.tasks());
        let mut items = Vec::new();
        for view in index.flow_view() {
            flatten_view(&view, 0, &mut items);
        }
        items
    });
    list_response("flow_list", result)
}

/// Freezer column: every frozen task.
#[flutter_rust_bridge::frb(sync)]
pub fn freezer_list() -> TaskListResponse {
    let result = with_store(|store| {
        let index = ChainIndex::new(store.tasks());
        index
            .frozen_tasks()
            .into_iter()
            .map(|task| to_task_item(task, 0, false))
            .collect::<Vec<_>>()
    });
    list_response("freezer_list", result)
}

/// Flame column: today's intensity, streak and the heat map window.
#[flutter_rust_bridge::frb(sync)]
pub fn flame_status() -> FlameResponse {
    let window_days = store_config().heat_window_days;
    let now = Local::now();
    let result = with_store(|store| {
        let summary = flame_summary(store.tasks(), &now);
        let heat = heat_window(store.tasks(), now.date_naive(), window_days, &Local);
        (summary, heat)
    });

    match result {
        Ok((summary, heat)) => FlameResponse {
            completed_today: clamp_count(summary.completed_today),
            intensity: summary.intensity,
            phase: summary.phase.label().to_string(),
            streak_days: summary.streak_days,
            heat: heat
                .into_iter()
                .map(|bucket| HeatDayItem {
                    day: bucket.day.format("%Y-%m-%d").to_string(),
                    count: clamp_count(bucket.count),
                })
                .collect(),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi op=flame_status status=error error={err}");
            FlameResponse {
                completed_today: 0,
                intensity: 0,
                phase: "idle".to_string(),
                streak_days: 0,
                heat: Vec::new(),
            }
        }
    }
}

/// Serializes the whole collection for download.
#[flutter_rust_bridge::frb(sync)]
pub fn export_tasks() -> ExportResponse {
    let file_name = dump_file_name_today();
    let result = with_store(|store| export_dump(store.tasks()).map_err(|err| err.to_string()))
        .and_then(|inner| inner);
    match result {
        Ok(body) => ExportResponse {
            ok: true,
            file_name,
            body,
            message: "Export ready.".to_string(),
        },
        Err(err) => ExportResponse {
            ok: false,
            file_name,
            body: String::new(),
            message: format!("export_tasks failed: {err}"),
        },
    }
}

fn run_mutation(
    op: &str,
    task_id: String,
    f: impl FnOnce(&mut SharedStore, &TaskId) -> MutationOutcome,
) -> TaskActionResponse {
    let id = TaskId::new(task_id.trim());
    match with_store(|store| f(store, &id)) {
        Ok(outcome) => TaskActionResponse::from_outcome(op, &id, outcome),
        Err(err) => TaskActionResponse::failure(format!("{op} failed: {err}")),
    }
}

fn list_response(op: &str, result: Result<Vec<TaskItem>, String>) -> TaskListResponse {
    match result {
        Ok(items) => {
            let message = if items.is_empty() {
                "No tasks.".to_string()
            } else {
                format!("{} task(s).", items.len())
            };
            TaskListResponse { items, message }
        }
        Err(err) => TaskListResponse {
            items: Vec::new(),
            message: format!("{op} failed: {err}"),
        },
    }
}

fn flatten_view(view: &ChainView<'_>, depth: u32, out: &mut Vec<TaskItem>) {
    out.push(to_task_item(view.task, depth, view.chain_active));
    for child in &view.children {
        flatten_view(child, depth + 1, out);
    }
}

fn to_task_item(task: &TaskNode, depth: u32, chain_active: bool) -> TaskItem {
    TaskItem {
        task_id: task.id.to_string(),
        content: task.content.clone(),
        status: status_label(task.status).to_string(),
        parent_id: task.parent_id.as_ref().map(TaskId::to_string),
        feeling: task.feeling.map(|feeling| feeling.as_emoji().to_string()),
        reflection: task.reflection.clone(),
        created_at_ms: task.created_at,
        completed_at_ms: task.completed_at,
        depth,
        chain_active,
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Active => "active",
        TaskStatus::Completed => "completed",
        TaskStatus::Frozen => "frozen",
    }
}

fn clamp_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn normalize_id(raw: Option<String>) -> Option<TaskId> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(TaskId::new)
}

fn store_config() -> &'static StoreConfig {
    STORE_CONFIG.get_or_init(StoreConfig::from_env)
}

fn open_shared_store() -> Mutex<SharedStore> {
    let config = store_config();
    let storage: Box<dyn TaskStorage> = match SqliteKvStorage::from_config(config) {
        Ok(storage) => Box::new(storage),
        Err(err) => {
            warn!(
                "event=store_open module=ffi status=error error_code=storage_unavailable fallback=memory error={err}"
            );
            Box::new(MemoryStorage::new())
        }
    };
    Mutex::new(TaskStore::open(storage))
}

fn with_store<T>(f: impl FnOnce(&mut SharedStore) -> T) -> Result<T, String> {
    let store = STORE.get_or_init(open_shared_store);
    let mut guard = store
        .lock()
        .map_err(|_| "task store lock poisoned".to_string())?;
    Ok(f(&mut guard))
}
