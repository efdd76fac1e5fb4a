//! Task store: the single owner of the task collection.
//!
//! # Responsibility
//! - Expose the only sanctioned mutation entry points for task nodes.
//! - Write the whole collection through to storage after every change.
//!
//! # Invariants
//! - Every operation runs to completion in memory before persisting.
//! - Unknown ids are a logged no-op, never an error.
//! - `parent_id` is only ever set to `None` or to an id present at write time,
//!   so parent links cannot close a cycle.
//! - A completed node never transitions back to active or frozen.
//! - Storage failures are logged and swallowed; the session keeps working
//!   from memory.
//! - A failed load disables write-through for the whole session, so an
//!   unreadable document is never replaced.

use crate::clock::{Clock, SystemClock};
use crate::derive::chain::ChainIndex;
use crate::model::task::{TaskFeeling, TaskId, TaskNode, TaskStatus};
use crate::storage::TaskStorage;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Result of one mutation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// State changed and was written through.
    Applied,
    /// Target exists but the request does not apply to its current state.
    Unchanged,
    /// No node with this id; nothing changed.
    NotFound(TaskId),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Owned task collection with write-through persistence.
pub struct TaskStore<S: TaskStorage> {
    tasks: Vec<TaskNode>,
    index: HashMap<TaskId, usize>,
    storage: S,
    clock: Box<dyn Clock>,
    persist_enabled: bool,
}

impl<S: TaskStorage> TaskStore<S> {
    /// Loads the collection from `storage` using wall-clock time.
    pub fn open(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }

    /// Loads the collection from `storage` using the provided clock.
    ///
    /// Missing or unreadable data yields an empty collection. Unreadable data
    /// also switches the session to memory only; see [`TaskStore::is_persisting`].
    pub fn with_clock(storage: S, clock: impl Clock + 'static) -> Self {
        let (loaded, persist_enabled) = match storage.load() {
            Ok(Some(tasks)) => (tasks, true),
            Ok(None) => {
                info!("event=store_load module=store status=ok source=empty");
                (Vec::new(), true)
            }
            Err(err) => {
                warn!(
                    "event=store_load module=store status=error error_code=storage_unavailable persist=disabled error={err}"
                );
                (Vec::new(), false)
            }
        };

        let tasks = sanitize_loaded(loaded);
        info!("event=store_load module=store status=ok count={}", tasks.len());
        let mut store = Self {
            tasks,
            index: HashMap::new(),
            storage,
            clock: Box::new(clock),
            persist_enabled,
        };
        store.rebuild_index(0);
        store
    }

    /// Current collection in insertion order.
    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    /// Owned copy of the current collection.
    pub fn snapshot(&self) -> Vec<TaskNode> {
        self.tasks.clone()
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskNode> {
        self.index.get(id).map(|position| &self.tasks[*position])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether mutations are written through. `false` after a failed load.
    pub fn is_persisting(&self) -> bool {
        self.persist_enabled
    }

    /// Read-only storage handle.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Appends a new active node and returns its id.
    ///
    /// Empty content is accepted. A `parent_id` that names no existing node is
    /// dropped, so the new node starts its own chain.
    pub fn add_task(
        &mut self,
        content: impl Into<String>,
        parent_id: Option<&TaskId>,
    ) -> TaskId {
        let parent_id = parent_id.and_then(|candidate| {
            if self.index.contains_key(candidate) {
                Some(candidate.clone())
            } else {
                warn!(
                    "event=task_mutation module=store op=add status=skip reason=parent_not_found parent_id={candidate}"
                );
                None
            }
        });
        self.push_node(content.into(), parent_id, "add")
    }

    /// Marks a node completed with an optional mood tag.
    ///
    /// Already completed nodes are left untouched, including their timestamp
    /// and feeling; use [`TaskStore::update_task_feeling`] to edit mood later.
    pub fn complete_task(
        &mut self,
        id: &TaskId,
        feeling: Option<TaskFeeling>,
    ) -> MutationOutcome {
        self.mutate("complete", id, |task, now| {
            if task.status == TaskStatus::Completed {
                return false;
            }
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now.max(task.created_at));
            task.feeling = feeling;
            true
        })
    }

    /// Defers a node out of the flow. Its parent link is kept.
    pub fn freeze_task(&mut self, id: &TaskId) -> MutationOutcome {
        self.mutate("freeze", id, |task, _| {
            if task.status != TaskStatus::Active {
                return false;
            }
            task.status = TaskStatus::Frozen;
            true
        })
    }

    /// Returns a node to the flow as the head of its own chain.
    ///
    /// Always clears `parent_id`, so the node never resumes inside a stale
    /// chain. Completed nodes are left untouched.
    pub fn unfreeze_task(&mut self, id: &TaskId) -> MutationOutcome {
        self.mutate("unfreeze", id, |task, _| {
            if task.status == TaskStatus::Completed {
                return false;
            }
            if task.status == TaskStatus::Active && task.parent_id.is_none() {
                return false;
            }
            task.status = TaskStatus::Active;
            task.parent_id = None;
            true
        })
    }

    /// Removes exactly one node. Its children are kept and re-root on the next
    /// derivation pass.
    pub fn delete_task(&mut self, id: &TaskId) -> MutationOutcome {
        let Some(position) = self.index.remove(id) else {
            return self.not_found("delete", id);
        };
        self.tasks.remove(position);
        self.rebuild_index(position);
        self.finish("delete", id)
    }

    pub fn update_task_content(
        &mut self,
        id: &TaskId,
        content: impl Into<String>,
    ) -> MutationOutcome {
        let content = content.into();
        self.mutate("update_content", id, |task, _| {
            if task.content == content {
                return false;
            }
            task.content = content;
            true
        })
    }

    pub fn update_task_reflection(
        &mut self,
        id: &TaskId,
        reflection: impl Into<String>,
    ) -> MutationOutcome {
        let reflection = Some(reflection.into());
        self.mutate("update_reflection", id, |task, _| {
            if task.reflection == reflection {
                return false;
            }
            task.reflection = reflection;
            true
        })
    }

    pub fn update_task_feeling(&mut self, id: &TaskId, feeling: TaskFeeling) -> MutationOutcome {
        self.mutate("update_feeling", id, |task, _| {
            if task.feeling == Some(feeling) {
                return false;
            }
            task.feeling = Some(feeling);
            true
        })
    }

    /// Inserts a new empty step as a child of `id`.
    ///
    /// The target keeps its own parent link. Returns `None` when the target
    /// does not exist.
    pub fn split_task(&mut self, id: &TaskId) -> Option<TaskId> {
        if !self.index.contains_key(id) {
            self.not_found("split", id);
            return None;
        }
        Some(self.push_node(String::new(), Some(id.clone()), "split"))
    }

    /// Flags every completed node as archived. Returns how many were newly
    /// flagged; a second call in a row returns 0 and writes nothing.
    pub fn archive_completed(&mut self) -> usize {
        let mut archived = 0;
        for task in self
            .tasks
            .iter_mut()
            .filter(|task| task.is_completed() && !task.is_archived())
        {
            task.archived = Some(true);
            archived += 1;
        }

        if archived > 0 {
            self.persist("archive_completed");
        }
        info!(
            "event=task_mutation module=store op=archive_completed status=ok count={archived}"
        );
        archived
    }

    fn push_node(
        &mut self,
        content: String,
        parent_id: Option<TaskId>,
        op: &'static str,
    ) -> TaskId {
        let node = TaskNode::new(content, parent_id, self.clock.now_ms());
        let id = node.id.clone();
        self.index.insert(id.clone(), self.tasks.len());
        self.tasks.push(node);
        self.finish(op, &id);
        id
    }

    fn mutate(
        &mut self,
        op: &'static str,
        id: &TaskId,
        apply: impl FnOnce(&mut TaskNode, i64) -> bool,
    ) -> MutationOutcome {
        let Some(position) = self.index.get(id).copied() else {
            return self.not_found(op, id);
        };

        let now = self.clock.now_ms();
        if !apply(&mut self.tasks[position], now) {
            debug!(
                "event=task_mutation module=store op={op} status=skip reason=unchanged task_id={id}"
            );
            return MutationOutcome::Unchanged;
        }
        self.finish(op, id)
    }

    fn finish(&mut self, op: &'static str, id: &TaskId) -> MutationOutcome {
        self.persist(op);
        info!("event=task_mutation module=store op={op} status=ok task_id={id}");
        MutationOutcome::Applied
    }

    fn not_found(&self, op: &'static str, id: &TaskId) -> MutationOutcome {
        warn!(
            "event=task_mutation module=store op={op} status=skip reason=not_found task_id={id}"
        );
        MutationOutcome::NotFound(id.clone())
    }

    fn persist(&self, op: &'static str) {
        if !self.persist_enabled {
            info!("event=store_persist module=store status=skip op={op} reason=memory_only");
            return;
        }
        if let Err(err) = self.storage.save(&self.tasks) {
            warn!(
                "event=store_persist module=store status=error op={op} error_code=storage_unavailable error={err}"
            );
        }
    }

    fn rebuild_index(&mut self, from: usize) {
        for (position, task) in self.tasks.iter().enumerate().skip(from) {
            self.index.insert(task.id.clone(), position);
        }
    }
}

/// Drops duplicate ids (first wins) and detaches nodes whose parent links
/// loop, so a loaded collection satisfies the same invariants as one built
/// through the store.
fn sanitize_loaded(tasks: Vec<TaskNode>) -> Vec<TaskNode> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(tasks.len());
    for task in tasks {
        if seen.insert(task.id.clone()) {
            unique.push(task);
        } else {
            warn!(
                "event=store_load module=store status=skip reason=duplicate_id task_id={}",
                task.id
            );
        }
    }

    loop {
        let on_cycle = {
            let index = ChainIndex::new(&unique);
            unique
                .iter()
                .find_map(|task| first_repeated_ancestor(&index, task))
        };
        let Some(id) = on_cycle else {
            break;
        };
        warn!("event=store_load module=store status=repair reason=parent_cycle task_id={id}");
        if let Some(task) = unique.iter_mut().find(|task| task.id == id) {
            task.parent_id = None;
        }
    }
    unique
}

/// Walks parent links from `start`; returns the first node seen twice, which
/// lies on a cycle.
fn first_repeated_ancestor(index: &ChainIndex<'_>, start: &TaskNode) -> Option<TaskId> {
    let mut visited = HashSet::new();
    let mut cursor = Some(start);
    while let Some(node) = cursor {
        if !visited.insert(node.id.as_str()) {
            return Some(node.id.clone());
        }
        cursor = node
            .parent_id
            .as_ref()
            .and_then(|parent_id| index.get(parent_id.as_str()));
    }
    None
}
