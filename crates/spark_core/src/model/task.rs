//! Task node domain model.
//!
//! # Responsibility
//! - Define the canonical record behind the flow/freezer/flame projections.
//! - Provide lifecycle helpers for status transitions.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `completed_at` is `Some` iff the node has entered `TaskStatus::Completed`.
//! - `parent_id` always names a node that existed when the link was made.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a task node.
///
/// Generated ids are UUID v4 strings, but persisted documents may carry any
/// non-empty string, so the id stays opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of a task. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// In the flow, waiting to be done.
    Active,
    /// Done. Terminal for status transitions.
    Completed,
    /// Deferred out of the flow.
    Frozen,
}

/// Mood tag recorded on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskFeeling {
    #[serde(rename = "😐")]
    Neutral,
    #[serde(rename = "🙂")]
    Good,
    #[serde(rename = "🤩")]
    Great,
}

impl TaskFeeling {
    /// Wire glyph for this feeling.
    pub fn as_emoji(self) -> &'static str {
        match self {
            Self::Neutral => "😐",
            Self::Good => "🙂",
            Self::Great => "🤩",
        }
    }

    /// Parses a wire glyph. Returns `None` for anything else.
    pub fn from_emoji(value: &str) -> Option<Self> {
        match value.trim() {
            "😐" => Some(Self::Neutral),
            "🙂" => Some(Self::Good),
            "🤩" => Some(Self::Great),
            _ => None,
        }
    }
}

/// One step in a chain of tasks.
///
/// Serialized with camelCase field names to match the persisted document
/// layout. Optional fields are omitted when unset and accept `null` on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNode {
    pub id: TaskId,
    /// Free text. Empty right after a split, until the user fills it in.
    pub content: String,
    pub status: TaskStatus,
    /// `None` means the node heads its own chain.
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    /// Meaningful only when `status == Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeling: Option<TaskFeeling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Set when the node is completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// Soft exclusion flag for finished work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl TaskNode {
    /// Creates an active node with a generated id.
    pub fn new(content: impl Into<String>, parent_id: Option<TaskId>, created_at: i64) -> Self {
        Self::with_id(TaskId::generate(), content, parent_id, created_at)
    }

    /// Creates an active node with a caller-provided id.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(
        id: TaskId,
        content: impl Into<String>,
        parent_id: Option<TaskId>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            status: TaskStatus::Active,
            parent_id,
            feeling: None,
            reflection: None,
            created_at,
            completed_at: None,
            archived: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_frozen(&self) -> bool {
        self.status == TaskStatus::Frozen
    }

    pub fn is_archived(&self) -> bool {
        self.archived.unwrap_or(false)
    }

    /// Timestamp used for recency ordering: completion time when present,
    /// creation time otherwise.
    pub fn recency_key(&self) -> i64 {
        self.completed_at.unwrap_or(self.created_at)
    }
}
