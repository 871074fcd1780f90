//! Durable task store with a staged-write read/write split.
//!
//! # Responsibility
//! - Own the persisted task set and route every mutation through one
//!   serialized write path.
//! - Serve reads from a merge-after-commit snapshot that never blocks on
//!   writers.

pub mod task_store;
