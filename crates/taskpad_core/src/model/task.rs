//! Task domain model.
//!
//! # Responsibility
//! - Define the durable task entity and its construction rules.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `created_at_ms` is immutable after construction.
//! - Listing order is `created_at_ms` descending, ties by insertion order.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for a task record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = Uuid;

/// Canonical durable task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable local ID, assigned at creation, never reused.
    pub id: TaskId,
    /// Display title. Callers must not pass an empty title; the store itself
    /// does not reject one.
    pub title: String,
    /// Free-form body text, may be empty.
    pub description: String,
    /// Unix epoch milliseconds, set once at creation.
    pub created_at_ms: i64,
    /// Completion state, the only flag toggled in place.
    pub is_completed: bool,
}

impl Task {
    /// Creates a new task with a generated stable ID and current timestamp.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, description, epoch_ms_now())
    }

    /// Creates a task with caller-provided identity and creation time.
    ///
    /// Used by import and edit round-trips where identity already exists.
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at_ms: i64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            created_at_ms,
            is_completed: false,
        }
    }

    /// Returns whether `title` or `description` contains `needle`
    /// case-insensitively. `needle` must already be lowercased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
pub fn epoch_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{epoch_ms_now, Task};
    use std::collections::HashSet;

    #[test]
    fn new_tasks_get_distinct_ids() {
        let ids: HashSet<_> = (0..64).map(|_| Task::new("t", "").id).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn new_task_starts_incomplete() {
        let task = Task::new("buy milk", "two liters");
        assert!(!task.is_completed);
        assert_eq!(task.title, "buy milk");
        assert_eq!(task.description, "two liters");
        assert!(task.created_at_ms > 0);
    }

    #[test]
    fn lowercase_match_covers_title_and_description() {
        let task = Task::new("Buy Milk", "from the CORNER shop");
        assert!(task.matches_lowercase("milk"));
        assert!(task.matches_lowercase("corner"));
        assert!(!task.matches_lowercase("bread"));
    }

    #[test]
    fn epoch_ms_now_is_monotonic_enough() {
        let a = epoch_ms_now();
        let b = epoch_ms_now();
        assert!(b >= a);
    }
}
