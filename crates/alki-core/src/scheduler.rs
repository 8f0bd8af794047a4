//! Deferred task scheduling
//!
//! The write queue never sleeps itself; it hands a future and a delay to a
//! `Scheduler`. Production code uses `TokioScheduler` (real clock), tests use
//! `ManualScheduler`, which only moves time when told to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs a future once a delay has elapsed
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run after `delay`
    ///
    /// The returned handle cancels the task if it has not started yet.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> ScheduledTask;
}

/// Handle to a scheduled task
#[derive(Debug)]
pub struct ScheduledTask {
    inner: TaskInner,
}

#[derive(Debug)]
enum TaskInner {
    Tokio(JoinHandle<()>),
    Manual {
        id: u64,
        state: Weak<Mutex<ManualState>>,
    },
}

impl ScheduledTask {
    /// Cancel the task if it has not fired
    ///
    /// Work that already started when the delay elapsed is not interrupted.
    pub fn cancel(self) {
        match self.inner {
            TaskInner::Tokio(handle) => handle.abort(),
            TaskInner::Manual { id, state } => {
                if let Some(state) = state.upgrade() {
                    lock_state(&state).tasks.retain(|task| task.id != id);
                }
            }
        }
    }
}

/// Scheduler backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> ScheduledTask {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach the work so a late cancel cannot abort it mid-request
            tokio::spawn(task);
        });

        ScheduledTask {
            inner: TaskInner::Tokio(handle),
        }
    }
}

struct PendingTask {
    id: u64,
    due: Duration,
    task: BoxFuture<'static, ()>,
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask")
            .field("id", &self.id)
            .field("due", &self.due)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    tasks: Vec<PendingTask>,
}

fn lock_state(state: &Mutex<ManualState>) -> MutexGuard<'_, ManualState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Virtual-clock scheduler
///
/// Time starts at zero and only advances through `advance`. Due tasks run in
/// deadline order (ties in scheduling order), each awaited to completion
/// before the next one starts.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        lock_state(&self.state).now
    }

    /// Number of tasks waiting to fire
    pub fn pending(&self) -> usize {
        lock_state(&self.state).tasks.len()
    }

    /// Move the clock forward, running every task that falls due
    ///
    /// Tasks scheduled by a running task are picked up if they fall due
    /// within the same window.
    pub async fn advance(&self, by: Duration) {
        let target = self.now() + by;

        while let Some(task) = self.pop_due(target) {
            task.await;
        }

        let mut state = lock_state(&self.state);
        if state.now < target {
            state.now = target;
        }
    }

    fn pop_due(&self, target: Duration) -> Option<BoxFuture<'static, ()>> {
        let mut state = lock_state(&self.state);
        let pos = state
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= target)
            .min_by_key(|(_, task)| (task.due, task.id))
            .map(|(pos, _)| pos)?;

        let task = state.tasks.remove(pos);
        state.now = task.due;
        debug!("Manual clock at {:?}, running task {}", task.due, task.id);
        Some(task.task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> ScheduledTask {
        let mut state = lock_state(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.tasks.push(PendingTask { id, due, task });

        ScheduledTask {
            inner: TaskInner::Manual {
                id,
                state: Arc::downgrade(&self.state),
            },
        }
    }
}
