//! Search debouncer: one delayed, cancelable query per burst of input.
//!
//! # Responsibility
//! - Turn per-keystroke query events into at most one store search per
//!   debounce window.
//!
//! # Invariants
//! - A newer submission cancels the pending one; a canceled query never
//!   delivers results (the generation is re-checked after the search runs,
//!   immediately before delivery).
//! - An empty query is not debounced: it cancels any pending query and
//!   delivers an unfiltered listing immediately.
//! - Deliveries are mutually exclusive; `on_results` must not call back into
//!   the debouncer.

use crate::model::task::Task;
use crate::store::task_store::{StoreResult, TaskStore};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default delay between the last query event and the store search.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

type ResultsCallback = dyn Fn(StoreResult<Vec<Task>>) + Send + Sync;

/// State machine: `Idle` (no pending query) -> `Pending` (latest query
/// queued, window running) -> `Idle`.
#[derive(Default)]
struct DebounceState {
    /// Bumped on every submission; a search only delivers when the
    /// generation it started under is still current.
    generation: u64,
    pending: Option<String>,
    shutdown: bool,
}

struct DebounceInner {
    state: Mutex<DebounceState>,
    wakeup: Condvar,
    store: Arc<TaskStore>,
    window: Duration,
    on_results: Box<ResultsCallback>,
}

/// Coalesces rapid query changes into a single delayed store search.
///
/// Dropping the debouncer cancels any pending query and stops the worker.
pub struct SearchDebouncer {
    inner: Arc<DebounceInner>,
    worker: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    /// Creates a debouncer delivering results through `on_results`.
    pub fn new(
        store: Arc<TaskStore>,
        window: Duration,
        on_results: impl Fn(StoreResult<Vec<Task>>) + Send + Sync + 'static,
    ) -> Self {
        let inner = Arc::new(DebounceInner {
            state: Mutex::new(DebounceState::default()),
            wakeup: Condvar::new(),
            store,
            window,
            on_results: Box::new(on_results),
        });

        let worker_inner = Arc::clone(&inner);
        let worker = thread::spawn(move || worker_loop(&worker_inner));

        Self {
            inner,
            worker: Some(worker),
        }
    }

    /// Submits a query-change event.
    ///
    /// A non-empty query replaces any pending one and restarts the window.
    /// An empty query cancels the pending one and delivers `list()` results
    /// immediately; clearing a search should feel instant.
    pub fn submit(&self, query: &str) {
        let mut state = lock_state(&self.inner.state);
        state.generation = state.generation.wrapping_add(1);

        if query.is_empty() {
            state.pending = None;
            // Delivered under the state lock so a pending search that lost
            // the generation race cannot interleave with this delivery.
            (self.inner.on_results)(self.inner.store.list());
            return;
        }

        state.pending = Some(query.to_string());
        self.inner.wakeup.notify_all();
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        {
            let mut state = lock_state(&self.inner.state);
            state.shutdown = true;
            state.pending = None;
            self.inner.wakeup.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(inner: &DebounceInner) {
    let mut state = lock_state(&inner.state);

    loop {
        while state.pending.is_none() && !state.shutdown {
            state = wait(inner, state);
        }
        if state.shutdown {
            return;
        }

        let generation = state.generation;
        let deadline = Instant::now() + inner.window;

        // Wait out the window; a newer submission bumps the generation and
        // restarts this loop with the replacement query.
        loop {
            let now = Instant::now();
            if now >= deadline || state.generation != generation || state.shutdown {
                break;
            }
            state = wait_timeout(inner, state, deadline - now);
        }
        if state.shutdown {
            return;
        }
        if state.generation != generation {
            continue;
        }

        let query = state.pending.take().unwrap_or_default();
        drop(state);

        let results = inner.store.search(&query);

        state = lock_state(&inner.state);
        // Cancellation check after the search, right before applying results:
        // a query superseded mid-search must not overwrite newer output.
        if state.generation == generation && !state.shutdown {
            (inner.on_results)(results);
        }
    }
}

fn lock_state<'a>(mutex: &'a Mutex<DebounceState>) -> MutexGuard<'a, DebounceState> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn wait<'a>(
    inner: &'a DebounceInner,
    guard: MutexGuard<'a, DebounceState>,
) -> MutexGuard<'a, DebounceState> {
    match inner.wakeup.wait(guard) {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn wait_timeout<'a>(
    inner: &'a DebounceInner,
    guard: MutexGuard<'a, DebounceState>,
    timeout: Duration,
) -> MutexGuard<'a, DebounceState> {
    match inner.wakeup.wait_timeout(guard, timeout) {
        Ok((guard, _)) => guard,
        Err(poisoned) => poisoned.into_inner().0,
    }
}
