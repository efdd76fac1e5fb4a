//! Task chain domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the store and derivations.
//! - Keep one flat node shape; chains are expressed through `parent_id` links.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - The collection forms a forest: parent links never close a cycle.

pub mod task;
