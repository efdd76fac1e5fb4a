//! Flutter-facing bindings for the Spark core.

pub mod api;
