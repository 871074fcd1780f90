//! One-time seed import coordinator.
//!
//! # Responsibility
//! - On first launch, pull seed tasks from the remote source, bulk-insert
//!   them into the store, then flip the launch flag.
//!
//! # Invariants
//! - The launch flag is set only after the bulk import committed; a failed
//!   fetch or import leaves it unset so the next call retries the whole run.
//! - Concurrent `ensure_seeded` calls are serialized by an in-flight guard;
//!   duplicate invocations cannot double-import.
//! - The coordinator is the only writer of the launch flag.

use crate::model::task::{epoch_ms_now, Task, TaskId};
use crate::remote::task_source::{RemoteError, SeedTask, SeedTaskSource};
use crate::store::task_store::{StoreError, TaskStore};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

pub type SeedResult<T> = Result<T, SeedError>;

/// Seeding failure: either the remote fetch or the local import broke.
#[derive(Debug)]
pub enum SeedError {
    Remote(RemoteError),
    Store(StoreError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(err) => write!(f, "seed fetch failed: {err}"),
            Self::Store(err) => write!(f, "seed import failed: {err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RemoteError> for SeedError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<StoreError> for SeedError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// What `ensure_seeded` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The flag was already set; no fetch happened.
    AlreadySeeded,
    /// A fresh import ran and committed `count` tasks.
    Imported { count: usize },
}

/// Orchestrates the one-time first-launch import.
pub struct SeedCoordinator {
    store: Arc<TaskStore>,
    source: Arc<dyn SeedTaskSource>,
    in_flight: Mutex<()>,
}

impl SeedCoordinator {
    pub fn new(store: Arc<TaskStore>, source: Arc<dyn SeedTaskSource>) -> Self {
        Self {
            store,
            source,
            in_flight: Mutex::new(()),
        }
    }

    /// Runs the seed import if it has not completed yet.
    ///
    /// Serialized: a second caller blocks until the first run finishes and
    /// then observes its outcome through the flag.
    pub fn ensure_seeded(&self) -> SeedResult<SeedOutcome> {
        let _guard = lock_in_flight(&self.in_flight);

        if self.store.seed_completed() {
            info!("event=seed_import module=sync status=skip reason=already_seeded");
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let started_at = Instant::now();
        info!("event=seed_import module=sync status=start");

        let seeds = self.source.fetch_seed_tasks().map_err(|err| {
            error!(
                "event=seed_import module=sync status=error stage=fetch error={err}"
            );
            SeedError::Remote(err)
        })?;

        let imported_at_ms = epoch_ms_now();
        let tasks: Vec<Task> = seeds
            .into_iter()
            .map(|seed| seed_to_task(seed, imported_at_ms))
            .collect();

        let count = self.store.bulk_import(tasks).map_err(|err| {
            error!(
                "event=seed_import module=sync status=error stage=import error={err}"
            );
            SeedError::Store(err)
        })?;

        // Flag flips only after the import committed; a crash in between
        // re-runs the import on the next launch rather than losing it.
        self.store.mark_seeded()?;

        info!(
            "event=seed_import module=sync status=ok count={count} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(SeedOutcome::Imported { count })
    }
}

/// Maps one remote seed entry to a fresh local task.
///
/// The remote text becomes the title; the description stays empty and the
/// remote integer id is dropped in favor of a new local id.
fn seed_to_task(seed: SeedTask, imported_at_ms: i64) -> Task {
    Task {
        id: TaskId::new_v4(),
        title: seed.text,
        description: String::new(),
        created_at_ms: imported_at_ms,
        is_completed: seed.completed,
    }
}

fn lock_in_flight(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
