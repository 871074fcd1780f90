//! Domain model for task records.
//!
//! # Responsibility
//! - Define the canonical task shape shared by store, sync and search.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId` that is never reused.
//! - `created_at_ms` is assigned once at creation and never mutated.

pub mod task;
