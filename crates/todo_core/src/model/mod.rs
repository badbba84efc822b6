//! Domain model for the todo store.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field validation so every write path shares one rule set.
//!
//! # Invariants
//! - Every Todo is identified by a stable `TodoId`.
//! - Deletion is permanent; there are no tombstones.

pub mod todo;
