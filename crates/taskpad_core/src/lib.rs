//! Core domain logic for Taskpad, a single-user task tracker.
//! This crate is the single source of truth for business invariants:
//! serialized staged writes, one-time remote seeding and debounced search.

pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod search;
pub mod store;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{epoch_ms_now, Task, TaskId};
pub use remote::task_source::{
    HttpTaskSource, RemoteConfig, RemoteError, RemoteResult, SeedTask, SeedTaskSource,
    DEFAULT_SEED_ENDPOINT,
};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use search::debounce::{SearchDebouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use store::task_store::{StoreError, StoreEvent, StoreResult, TaskStore};
pub use sync::seed::{SeedCoordinator, SeedError, SeedOutcome, SeedResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
