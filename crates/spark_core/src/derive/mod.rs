//! Pure view derivations consumed by presentation layers.
//!
//! # Responsibility
//! - Compute flow (chain), freezer and flame (heat/streak) views from a
//!   read-only task snapshot.
//!
//! # Invariants
//! - Nothing in this module mutates, caches or persists task state.

pub mod chain;
pub mod heat;
