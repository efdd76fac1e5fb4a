//! Chain derivations over a flat task snapshot.
//!
//! # Responsibility
//! - Decide which nodes head a chain, in which order, and what hangs below.
//! - Answer whether a chain still has unfinished work anywhere in its descent.
//!
//! # Invariants
//! - Pure: no function here mutates or persists the collection.
//! - Frozen nodes never appear inside a chain; they only show in the freezer.
//! - A node whose parent is missing, frozen or archived heads its own chain.
//! - Root order: chain-active first, then newest first by
//!   `completed_at.unwrap_or(created_at)`, ties in insertion order.
//! - Corrupted snapshots with parent cycles never loop.

use crate::model::task::{TaskNode, TaskStatus};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// One node of the rendered flow tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainView<'a> {
    pub task: &'a TaskNode,
    /// Whether this node or a live descendant is still active.
    pub chain_active: bool,
    /// Visible children, oldest first.
    pub children: Vec<ChainView<'a>>,
}

impl ChainView<'_> {
    /// Number of nodes in this subtree, including the head.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ChainView::node_count)
            .sum::<usize>()
    }
}

/// Arena index over one snapshot: id lookup plus parent -> children lists.
///
/// Build once per derivation pass; lookups are O(1) and child lists keep
/// snapshot (insertion) order.
pub struct ChainIndex<'a> {
    tasks: &'a [TaskNode],
    by_id: HashMap<&'a str, &'a TaskNode>,
    children: HashMap<&'a str, Vec<&'a TaskNode>>,
}

impl<'a> ChainIndex<'a> {
    pub fn new(tasks: &'a [TaskNode]) -> Self {
        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut children: HashMap<&'a str, Vec<&'a TaskNode>> = HashMap::new();
        for task in tasks {
            by_id.entry(task.id.as_str()).or_insert(task);
            if let Some(parent_id) = &task.parent_id {
                children.entry(parent_id.as_str()).or_default().push(task);
            }
        }
        Self {
            tasks,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a TaskNode> {
        self.by_id.get(id).copied()
    }

    /// Whether `id` is frozen-free and has an active node somewhere on a
    /// non-frozen downward path starting at itself.
    pub fn is_chain_active(&self, id: &str) -> bool {
        let Some(start) = self.get(id) else {
            return false;
        };

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if node.status == TaskStatus::Frozen || !visited.insert(node.id.as_str()) {
                continue;
            }
            if node.status == TaskStatus::Active {
                return true;
            }
            if let Some(kids) = self.children.get(node.id.as_str()) {
                stack.extend(kids.iter().copied());
            }
        }
        false
    }

    /// Whether `task` is shown as the head of its own chain.
    pub fn is_root(&self, task: &TaskNode) -> bool {
        if task.is_frozen() || task.is_archived() {
            return false;
        }
        match &task.parent_id {
            None => true,
            Some(parent_id) => match self.get(parent_id.as_str()) {
                None => true,
                Some(parent) => parent.is_frozen() || parent.is_archived(),
            },
        }
    }

    /// Chain heads in display order.
    pub fn root_tasks(&self) -> Vec<&'a TaskNode> {
        let mut roots: Vec<(bool, &'a TaskNode)> = self
            .tasks
            .iter()
            .filter(|task| self.is_root(task))
            .map(|task| (self.is_chain_active(task.id.as_str()), task))
            .collect();
        roots.sort_by(|(a_active, a), (b_active, b)| {
            compare_roots(*a_active, a, *b_active, b)
        });
        roots.into_iter().map(|(_, task)| task).collect()
    }

    /// Visible children of `id`, oldest first.
    pub fn children_of(&self, id: &str) -> Vec<&'a TaskNode> {
        let mut visible: Vec<&'a TaskNode> = self
            .children
            .get(id)
            .map(|kids| {
                kids.iter()
                    .copied()
                    .filter(|task| !task.is_frozen() && !task.is_archived())
                    .collect()
            })
            .unwrap_or_default();
        visible.sort_by_key(|task| task.created_at);
        visible
    }

    /// Every frozen node, in snapshot order.
    pub fn frozen_tasks(&self) -> Vec<&'a TaskNode> {
        self.tasks.iter().filter(|task| task.is_frozen()).collect()
    }

    /// Ordered roots with their visible descendants expanded.
    pub fn flow_view(&self) -> Vec<ChainView<'a>> {
        let mut expanded = HashSet::new();
        self.root_tasks()
            .into_iter()
            .map(|root| self.expand(root, &mut expanded))
            .collect()
    }

    fn expand(&self, task: &'a TaskNode, expanded: &mut HashSet<&'a str>) -> ChainView<'a> {
        expanded.insert(task.id.as_str());
        let mut children = Vec::new();
        for child in self.children_of(task.id.as_str()) {
            if expanded.contains(child.id.as_str()) {
                continue;
            }
            children.push(self.expand(child, expanded));
        }
        ChainView {
            task,
            chain_active: self.is_chain_active(task.id.as_str()),
            children,
        }
    }

    /// Whether following `parent_id` links from `id` ends at a root (null or
    /// missing parent) without revisiting a node.
    pub fn parent_chain_terminates(&self, id: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut cursor = self.get(id);
        while let Some(node) = cursor {
            if !visited.insert(node.id.as_str()) {
                return false;
            }
            cursor = node
                .parent_id
                .as_ref()
                .and_then(|parent_id| self.get(parent_id.as_str()));
        }
        true
    }
}

fn compare_roots(a_active: bool, a: &TaskNode, b_active: bool, b: &TaskNode) -> Ordering {
    b_active
        .cmp(&a_active)
        .then_with(|| b.recency_key().cmp(&a.recency_key()))
}

/// See [`ChainIndex::is_chain_active`].
pub fn is_chain_active(id: &str, tasks: &[TaskNode]) -> bool {
    ChainIndex::new(tasks).is_chain_active(id)
}

/// See [`ChainIndex::root_tasks`].
pub fn root_tasks(tasks: &[TaskNode]) -> Vec<&TaskNode> {
    ChainIndex::new(tasks).root_tasks()
}

/// See [`ChainIndex::children_of`].
pub fn children_of<'a>(id: &str, tasks: &'a [TaskNode]) -> Vec<&'a TaskNode> {
    ChainIndex::new(tasks).children_of(id)
}

/// See [`ChainIndex::frozen_tasks`].
pub fn frozen_tasks(tasks: &[TaskNode]) -> Vec<&TaskNode> {
    tasks.iter().filter(|task| task.is_frozen()).collect()
}

/// See [`ChainIndex::flow_view`].
pub fn flow_view(tasks: &[TaskNode]) -> Vec<ChainView<'_>> {
    ChainIndex::new(tasks).flow_view()
}

/// See [`ChainIndex::parent_chain_terminates`].
pub fn parent_chain_terminates(id: &str, tasks: &[TaskNode]) -> bool {
    ChainIndex::new(tasks).parent_chain_terminates(id)
}
