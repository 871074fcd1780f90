//! Task store: serialized background writes, snapshot foreground reads.
//!
//! # Responsibility
//! - Provide CRUD, search and bulk import over durable task records.
//! - Guard the one-time seed flag alongside the task set.
//!
//! # Invariants
//! - A dedicated writer thread owns the only SQLite connection; all mutations
//!   are queued to it and applied in submission order, one at a time.
//! - Every write commits to SQLite first, then merges into the in-memory
//!   snapshot, then replies to the caller. A caller that received `Ok` will
//!   therefore observe its own write on the next read.
//! - Reads never block on pending writes; a read racing a write may return
//!   the pre-write snapshot.
//! - The snapshot is always held in listing order: `created_at_ms`
//!   descending, ties in insertion order.

use crate::db::{open_db, open_db_in_memory};
use crate::model::task::{Task, TaskId};
use crate::repo::flag_repo;
use crate::repo::task_repo::{RepoError, SqliteTaskRepository, TaskRepository};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::sync::{mpsc, Arc, Mutex, RwLock, RwLockReadGuard};
use std::thread::{self, JoinHandle};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error taxonomy surfaced to callers.
#[derive(Debug)]
pub enum StoreError {
    /// A write (insert/update/delete/bulk) could not be committed.
    PersistFailed(RepoError),
    /// Loading persisted state failed.
    FetchFailed(RepoError),
    /// `update`/`delete` referenced an id with no matching record.
    NotFound(TaskId),
    /// The background writer is gone; the store handle is unusable.
    WriterGone,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersistFailed(err) => write!(f, "task write failed: {err}"),
            Self::FetchFailed(err) => write!(f, "task read failed: {err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::WriterGone => write!(f, "background writer disconnected"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PersistFailed(err) | Self::FetchFailed(err) => Some(err),
            Self::NotFound(_) | Self::WriterGone => None,
        }
    }
}

/// Change notification emitted after a write has committed and merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created(Task),
    Updated(Task),
    Deleted(TaskId),
    Imported { count: usize },
}

enum WriteCommand {
    Insert {
        task: Task,
        reply: SyncSender<StoreResult<Task>>,
    },
    Update {
        task: Task,
        reply: SyncSender<StoreResult<()>>,
    },
    Delete {
        id: TaskId,
        reply: SyncSender<StoreResult<()>>,
    },
    BulkImport {
        tasks: Vec<Task>,
        reply: SyncSender<StoreResult<usize>>,
    },
    MarkSeeded {
        reply: SyncSender<StoreResult<()>>,
    },
    Shutdown,
}

struct StoreShared {
    /// Read-context snapshot, always in listing order.
    snapshot: RwLock<Vec<Task>>,
    /// Cached launch flag; durable copy lives in `app_flags`.
    seeded: AtomicBool,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

/// Durable task store handle.
///
/// Share between callers via `Arc<TaskStore>`; dropping the handle shuts the
/// writer thread down.
pub struct TaskStore {
    shared: Arc<StoreShared>,
    write_tx: Sender<WriteCommand>,
    writer: Option<JoinHandle<()>>,
}

impl TaskStore {
    /// Opens a file-backed store, loading the snapshot and launch flag.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path).map_err(|err| StoreError::FetchFailed(RepoError::Db(err)))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store. State does not survive the handle.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(|err| StoreError::FetchFailed(RepoError::Db(err)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let (initial, seeded) = {
            let repo = SqliteTaskRepository::new(&conn);
            let tasks = repo.list_tasks().map_err(StoreError::FetchFailed)?;
            let seeded = flag_repo::first_launch_done(&conn).map_err(StoreError::FetchFailed)?;
            (tasks, seeded)
        };

        info!(
            "event=store_open module=store status=ok tasks={} seeded={seeded}",
            initial.len()
        );

        let shared = Arc::new(StoreShared {
            snapshot: RwLock::new(initial),
            seeded: AtomicBool::new(seeded),
            subscribers: Mutex::new(Vec::new()),
        });

        let (write_tx, write_rx) = mpsc::channel();
        let writer_shared = Arc::clone(&shared);
        let writer = thread::spawn(move || writer_loop(conn, write_rx, writer_shared));

        Ok(Self {
            shared,
            write_tx,
            writer: Some(writer),
        })
    }

    /// Creates a task from user input and persists it.
    pub fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> StoreResult<Task> {
        self.insert(Task::new(title, description))
    }

    /// Persists a fully-formed task, preserving its id and creation time.
    pub fn insert(&self, task: Task) -> StoreResult<Task> {
        self.submit(|reply| WriteCommand::Insert { task, reply })
    }

    /// Returns all tasks, newest first.
    pub fn list(&self) -> StoreResult<Vec<Task>> {
        Ok(self.read_snapshot().clone())
    }

    /// Returns tasks whose title or description contains `query`
    /// case-insensitively, in listing order. An empty query lists everything.
    pub fn search(&self, query: &str) -> StoreResult<Vec<Task>> {
        if query.is_empty() {
            return self.list();
        }

        let needle = query.to_lowercase();
        Ok(self
            .read_snapshot()
            .iter()
            .filter(|task| task.matches_lowercase(&needle))
            .cloned()
            .collect())
    }

    /// Overwrites title, description and completion of an existing task.
    ///
    /// `id` and `created_at_ms` are never changed by an update.
    pub fn update(&self, task: Task) -> StoreResult<()> {
        self.submit(|reply| WriteCommand::Update { task, reply })
    }

    /// Removes a task by its id.
    pub fn delete(&self, task: &Task) -> StoreResult<()> {
        let id = task.id;
        self.submit(|reply| WriteCommand::Delete { id, reply })
    }

    /// Inserts every task as a new record in one durable transaction.
    pub fn bulk_import(&self, tasks: Vec<Task>) -> StoreResult<usize> {
        self.submit(|reply| WriteCommand::BulkImport { tasks, reply })
    }

    /// Returns whether the one-time seed import has completed.
    pub fn seed_completed(&self) -> bool {
        self.shared.seeded.load(Ordering::SeqCst)
    }

    /// Durably flips the launch flag to "seeded".
    pub fn mark_seeded(&self) -> StoreResult<()> {
        self.submit(|reply| WriteCommand::MarkSeeded { reply })
    }

    /// Registers a change listener. Events arrive after the corresponding
    /// write has committed and merged; dropped receivers are pruned lazily.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        lock_unpoisoned(&self.shared.subscribers).push(tx);
        rx
    }

    fn submit<T>(
        &self,
        build: impl FnOnce(SyncSender<StoreResult<T>>) -> WriteCommand,
    ) -> StoreResult<T> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.write_tx
            .send(build(reply_tx))
            .map_err(|_| StoreError::WriterGone)?;
        reply_rx.recv().map_err(|_| StoreError::WriterGone)?
    }

    fn read_snapshot(&self) -> RwLockReadGuard<'_, Vec<Task>> {
        match self.shared.snapshot.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        let _ = self.write_tx.send(WriteCommand::Shutdown);
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn writer_loop(conn: Connection, commands: Receiver<WriteCommand>, shared: Arc<StoreShared>) {
    let repo = SqliteTaskRepository::new(&conn);

    while let Ok(command) = commands.recv() {
        match command {
            WriteCommand::Shutdown => break,
            WriteCommand::Insert { task, reply } => {
                let result = match repo.create_task(&task) {
                    Ok(_) => {
                        merge_insert(&shared, task.clone());
                        notify(&shared, StoreEvent::Created(task.clone()));
                        Ok(task)
                    }
                    Err(err) => Err(write_error(err)),
                };
                let _ = reply.send(result);
            }
            WriteCommand::Update { task, reply } => {
                let result = match repo.update_task(&task) {
                    Ok(()) => {
                        merge_update(&shared, &task);
                        notify(&shared, StoreEvent::Updated(task));
                        Ok(())
                    }
                    Err(err) => Err(write_error(err)),
                };
                let _ = reply.send(result);
            }
            WriteCommand::Delete { id, reply } => {
                let result = match repo.delete_task(id) {
                    Ok(()) => {
                        merge_delete(&shared, id);
                        notify(&shared, StoreEvent::Deleted(id));
                        Ok(())
                    }
                    Err(err) => Err(write_error(err)),
                };
                let _ = reply.send(result);
            }
            WriteCommand::BulkImport { tasks, reply } => {
                let result = match repo.bulk_import(&tasks) {
                    Ok(count) => {
                        merge_bulk(&shared, tasks);
                        notify(&shared, StoreEvent::Imported { count });
                        Ok(count)
                    }
                    Err(err) => {
                        error!(
                            "event=bulk_import module=store status=error error={err}"
                        );
                        Err(write_error(err))
                    }
                };
                let _ = reply.send(result);
            }
            WriteCommand::MarkSeeded { reply } => {
                let result = match flag_repo::mark_first_launch_done(&conn) {
                    Ok(()) => {
                        shared.seeded.store(true, Ordering::SeqCst);
                        Ok(())
                    }
                    Err(err) => Err(write_error(err)),
                };
                let _ = reply.send(result);
            }
        }
    }
}

fn write_error(err: RepoError) -> StoreError {
    match err {
        RepoError::NotFound(id) => StoreError::NotFound(id),
        other => StoreError::PersistFailed(other),
    }
}

/// Merge step: inserts into the snapshot at its listing-order position.
/// Equal timestamps keep earlier-inserted tasks first.
fn merge_insert(shared: &StoreShared, task: Task) {
    let mut snapshot = write_unpoisoned(&shared.snapshot);
    insert_in_listing_order(&mut snapshot, task);
}

/// Merge step for a bulk import: the whole batch lands under one write
/// guard, so readers see either the pre-import or the fully merged snapshot,
/// never a partially applied batch.
fn merge_bulk(shared: &StoreShared, tasks: Vec<Task>) {
    let mut snapshot = write_unpoisoned(&shared.snapshot);
    for task in tasks {
        insert_in_listing_order(&mut snapshot, task);
    }
}

fn insert_in_listing_order(snapshot: &mut Vec<Task>, task: Task) {
    let position = snapshot.partition_point(|existing| existing.created_at_ms >= task.created_at_ms);
    snapshot.insert(position, task);
}

fn merge_update(shared: &StoreShared, task: &Task) {
    let mut snapshot = write_unpoisoned(&shared.snapshot);
    if let Some(existing) = snapshot.iter_mut().find(|existing| existing.id == task.id) {
        existing.title = task.title.clone();
        existing.description = task.description.clone();
        existing.is_completed = task.is_completed;
    }
}

fn merge_delete(shared: &StoreShared, id: TaskId) {
    let mut snapshot = write_unpoisoned(&shared.snapshot);
    snapshot.retain(|existing| existing.id != id);
}

fn notify(shared: &StoreShared, event: StoreEvent) {
    let mut subscribers = lock_unpoisoned(&shared.subscribers);
    subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
}

fn write_unpoisoned<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
