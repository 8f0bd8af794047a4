//! Coalescing write queue
//!
//! Turns a stream of fine-grained edits (one per keystroke) into infrequent
//! remote writes without making the editor wait on the network.
//!
//! ## Per-item lifecycle
//!
//! 1. `update` applies the patch to the store immediately
//! 2. The patch is merged into the item's pending entry and its flush timer
//!    is (re)started for the quiet period
//! 3. When the timer fires the entry is taken out of the queue and its patch
//!    is sent as one `update` to the remote
//!
//! An edit arriving while a flush is in flight starts a new entry; the
//! request already sent is never touched. Requests for the same item are
//! sent one at a time, in order. Failures are recorded in the store and the
//! item is marked unsynced. Nothing is rolled back or retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::{FailureKind, SyncFailure};
use crate::models::{ItemId, ItemPatch};
use crate::remote::ItemRemote;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::store::{self, SharedStore};

/// Default quiet period before a flush
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(400);

/// Accumulated edits for one item
#[derive(Debug)]
struct PendingWrite {
    patch: ItemPatch,
    /// Identifies the timer allowed to flush this entry
    generation: u64,
    timer: Option<ScheduledTask>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: HashMap<ItemId, PendingWrite>,
    next_generation: u64,
    /// Per-item send locks keeping same-item requests in order
    in_flight: HashMap<ItemId, Arc<tokio::sync::Mutex<()>>>,
}

struct QueueInner {
    store: SharedStore,
    remote: Arc<dyn ItemRemote>,
    scheduler: Arc<dyn Scheduler>,
    quiet_period: Duration,
    mode: SyncMode,
    state: Mutex<QueueState>,
}

/// Debounced, per-item coalescing of remote writes
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct WriteQueue {
    inner: Arc<QueueInner>,
}

impl WriteQueue {
    pub fn new(
        store: SharedStore,
        remote: Arc<dyn ItemRemote>,
        scheduler: Arc<dyn Scheduler>,
        quiet_period: Duration,
        mode: SyncMode,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                store,
                remote,
                scheduler,
                quiet_period,
                mode,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn quiet_period(&self) -> Duration {
        self.inner.quiet_period
    }

    /// Apply an edit locally and schedule its remote write
    ///
    /// Never blocks. Empty ids are ignored. With `TokioScheduler` this must
    /// be called from within a tokio runtime, since the flush timer is a
    /// spawned task.
    pub fn update(&self, id: &ItemId, patch: ItemPatch) {
        if id.is_empty() {
            return;
        }

        store::lock(&self.inner.store).apply_local_patch(id, &patch);

        if self.inner.mode == SyncMode::Local {
            return;
        }

        let mut state = self.state();
        state.next_generation += 1;
        let generation = state.next_generation;

        let entry = state.pending.entry(id.clone()).or_insert_with(|| PendingWrite {
            patch: ItemPatch::default(),
            generation,
            timer: None,
        });
        entry.patch.merge(patch);
        entry.generation = generation;
        if let Some(timer) = entry.timer.take() {
            timer.cancel();
        }

        let queue = self.clone();
        let flush_id = id.clone();
        entry.timer = Some(self.inner.scheduler.schedule(
            self.inner.quiet_period,
            Box::pin(async move {
                queue.flush_scheduled(flush_id, generation).await;
            }),
        ));

        debug!(
            "Scheduled flush for item {} in {:?} (generation {})",
            id, self.inner.quiet_period, generation
        );
    }

    /// Flush the pending entry for `id` now
    ///
    /// Returns `None` when nothing was pending, otherwise whether the write
    /// succeeded.
    pub async fn flush_now(&self, id: &ItemId) -> Option<bool> {
        let patch = self.take(id)?;
        Some(self.send(id.clone(), patch).await)
    }

    /// Flush every pending entry now, concurrently across items
    ///
    /// Returns true when every write succeeded.
    pub async fn flush_all(&self) -> bool {
        let entries = self.drain();
        if entries.is_empty() {
            return true;
        }

        debug!("Flushing {} pending write(s)", entries.len());
        let results = join_all(
            entries
                .into_iter()
                .map(|(id, patch)| self.send(id, patch)),
        )
        .await;

        results.into_iter().all(|ok| ok)
    }

    /// Drop the pending entry for `id` without sending it
    pub fn discard(&self, id: &ItemId) -> bool {
        let mut state = self.state();
        state.in_flight.remove(id);
        match state.pending.remove(id) {
            Some(entry) => {
                if let Some(timer) = entry.timer {
                    timer.cancel();
                }
                true
            }
            None => false,
        }
    }

    /// Cancel every timer that has not fired, dropping the pending edits
    ///
    /// Returns how many entries were dropped.
    pub fn cancel_all(&self) -> usize {
        let dropped = self.drain().len();
        if dropped > 0 {
            warn!("Dropped {} unsent pending write(s)", dropped);
        }
        dropped
    }

    /// Number of items with a pending entry
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// The accumulated patch waiting for `id`
    pub fn pending_patch(&self, id: &ItemId) -> Option<ItemPatch> {
        self.state().pending.get(id).map(|entry| entry.patch.clone())
    }

    async fn flush_scheduled(&self, id: ItemId, generation: u64) {
        let patch = {
            let mut state = self.state();
            let current = state.pending.get(&id).map(|entry| entry.generation);
            if current == Some(generation) {
                state.pending.remove(&id).map(|entry| entry.patch)
            } else {
                None
            }
        };

        match patch {
            Some(patch) => {
                self.send(id, patch).await;
            }
            None => debug!("Stale flush for item {} skipped", id),
        }
    }

    fn take(&self, id: &ItemId) -> Option<ItemPatch> {
        let entry = self.state().pending.remove(id)?;
        if let Some(timer) = entry.timer {
            timer.cancel();
        }
        Some(entry.patch)
    }

    fn drain(&self) -> Vec<(ItemId, ItemPatch)> {
        let entries: Vec<_> = self.state().pending.drain().collect();
        entries
            .into_iter()
            .map(|(id, entry)| {
                if let Some(timer) = entry.timer {
                    timer.cancel();
                }
                (id, entry.patch)
            })
            .collect()
    }

    fn send_lock(&self, id: &ItemId) -> Arc<tokio::sync::Mutex<()>> {
        self.state()
            .in_flight
            .entry(id.clone())
            .or_default()
            .clone()
    }

    /// Forget the send lock for `id` unless another send holds a handle to it
    fn release_send_lock(&self, id: &ItemId, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut state = self.state();
        // One handle in the map, one held by the caller
        if Arc::strong_count(lock) <= 2 {
            if let Some(tracked) = state.in_flight.get(id) {
                if Arc::ptr_eq(tracked, lock) {
                    state.in_flight.remove(id);
                }
            }
        }
    }

    async fn send(&self, id: ItemId, patch: ItemPatch) -> bool {
        let lock = self.send_lock(&id);
        let ok = {
            let _in_flight = lock.lock().await;

            debug!("Flushing item {}", id);
            match self.inner.remote.update(&id, &patch).await {
                Ok(()) => {
                    store::lock(&self.inner.store).mark_synced(&id);
                    true
                }
                Err(e) => {
                    warn!("Write for item {} failed: {}", id, e);
                    let failure = SyncFailure::new(FailureKind::Write, Some(id.clone()), &e);
                    store::lock(&self.inner.store).record_write_failure(&id, failure);
                    false
                }
            }
        };

        self.release_send_lock(&id, &lock);
        ok
    }

    #[cfg(test)]
    fn tracked_send_locks(&self) -> usize {
        self.state().in_flight.len()
    }
}

impl std::fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteQueue")
            .field("quiet_period", &self.inner.quiet_period)
            .field("mode", &self.inner.mode)
            .field("pending", &self.pending_count())
            .finish()
    }
}
