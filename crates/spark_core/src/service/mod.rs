//! Core use-case services.
//!
//! # Responsibility
//! - Own the task collection and funnel every write through one entry point.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod task_store;
