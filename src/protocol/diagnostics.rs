//! Live view into a WebSocket handler's concurrency state.
//!
//! DESIGN
//! ======
//! Handlers register every per-operation task here instead of in private
//! fields, so tests read task lifecycle through a deliberate interface.
//! All state sits behind `std::sync::Mutex`; snapshots are cheap and safe
//! to take while operation tasks are running.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::Protocol;

/// Identifies the raw connection a handler serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub protocol: Protocol,
}

/// Point-in-time state of one tracked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Operation id, or a fixed label for connection-level timers.
    pub name: String,
    pub finished: bool,
}

struct TrackedTask {
    seq: u64,
    handle: JoinHandle<()>,
}

pub struct ConnectionDiagnostics {
    handle: ConnectionHandle,
    operations: Mutex<HashMap<String, TrackedTask>>,
    init_timeout: Mutex<Option<JoinHandle<()>>>,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
    next_seq: AtomicU64,
    closed: watch::Sender<bool>,
}

pub const INIT_TIMEOUT_TASK: &str = "connection_init_timeout";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionDiagnostics {
    #[must_use]
    pub fn new(handle: ConnectionHandle) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            handle,
            operations: Mutex::new(HashMap::new()),
            init_timeout: Mutex::new(None),
            keep_alive: Mutex::new(None),
            next_seq: AtomicU64::new(0),
            closed,
        }
    }

    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Snapshot of the per-operation tasks currently tracked.
    #[must_use]
    pub fn get_tasks(&self) -> Vec<TaskSnapshot> {
        let mut tasks: Vec<_> = lock(&self.operations)
            .iter()
            .map(|(id, task)| TaskSnapshot { name: id.clone(), finished: task.handle.is_finished() })
            .collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        tasks
    }

    /// The pending connection-init timeout, for protocols that have one.
    #[must_use]
    pub fn connection_init_timeout(&self) -> Option<TaskSnapshot> {
        lock(&self.init_timeout).as_ref().map(|handle| TaskSnapshot {
            name: INIT_TIMEOUT_TASK.to_owned(),
            finished: handle.is_finished(),
        })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the handler has torn down every tracked task.
    pub async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    // -------------------------------------------------------------------------
    // Handler side
    // -------------------------------------------------------------------------

    /// Spawn and track an operation task. The task drops its own entry when
    /// `fut` completes; a later task reusing the id is left alone.
    pub(crate) fn spawn_operation<F>(self: &Arc<Self>, id: String, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let this = Arc::clone(self);
        let task_id = id.clone();

        let mut operations = lock(&self.operations);
        let handle = tokio::spawn(async move {
            fut.await;
            this.finish_operation(&task_id, seq);
        });
        operations.insert(id, TrackedTask { seq, handle });
    }

    fn finish_operation(&self, id: &str, seq: u64) {
        let mut operations = lock(&self.operations);
        if operations.get(id).is_some_and(|task| task.seq == seq) {
            operations.remove(id);
        }
    }

    pub(crate) fn has_operation(&self, id: &str) -> bool {
        lock(&self.operations).contains_key(id)
    }

    /// Abort an operation. Returns whether it was tracked.
    pub(crate) fn cancel_operation(&self, id: &str) -> bool {
        let Some(task) = lock(&self.operations).remove(id) else {
            return false;
        };
        task.handle.abort();
        true
    }

    pub(crate) fn set_init_timeout(&self, handle: JoinHandle<()>) {
        *lock(&self.init_timeout) = Some(handle);
    }

    /// Stop the init timer but keep its handle observable.
    pub(crate) fn cancel_init_timeout(&self) {
        if let Some(handle) = lock(&self.init_timeout).as_ref() {
            handle.abort();
        }
    }

    pub(crate) fn set_keep_alive(&self, handle: JoinHandle<()>) {
        if let Some(previous) = lock(&self.keep_alive).replace(handle) {
            previous.abort();
        }
    }

    /// Cancel and join every task, then mark the connection closed.
    pub(crate) async fn shutdown(&self) {
        let mut handles: Vec<JoinHandle<()>> = lock(&self.operations)
            .drain()
            .map(|(_, task)| task.handle)
            .collect();
        handles.extend(lock(&self.keep_alive).take());
        for handle in &handles {
            handle.abort();
        }
        self.cancel_init_timeout();

        for handle in handles {
            let _ = handle.await;
        }
        let init_timeout = lock(&self.init_timeout).take();
        if let Some(mut handle) = init_timeout {
            let _ = (&mut handle).await;
            *lock(&self.init_timeout) = Some(handle);
        }
        self.closed.send_replace(true);
    }
}

#[cfg(test)]
#[path = "diagnostics_test.rs"]
mod tests;
