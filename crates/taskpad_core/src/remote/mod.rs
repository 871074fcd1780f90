//! Remote seed-data access.
//!
//! # Responsibility
//! - Fetch and decode the one-shot seed task list from the remote endpoint.

pub mod task_source;
