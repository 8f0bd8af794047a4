//! Editing session
//!
//! A `Session` owns one item store, one write queue and one remote
//! collection, and is the only surface presentation code talks to:
//!
//! - reads: `items`, `current_item`, `status`, `last_error`, ...
//! - edits: `update`, `save`, `select`
//! - CRUD: `add`, `remove`, `remove_local` (see `crud`)
//! - lifecycle: `bootstrap`, `close`, `teardown`
//!
//! ## Usage
//!
//! ```ignore
//! let session = Session::from_config(&config)?;
//! session.bootstrap().await;
//! session.update(&id, ItemPatch::default().with_html("<p>hi</p>"));
//! session.close().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::bootstrap::BootstrapLoader;
use crate::config::{Backend, Config, SyncMode};
use crate::error::SyncFailure;
use crate::models::{Item, ItemId, ItemPatch, Status};
use crate::queue::{WriteQueue, DEFAULT_QUIET_PERIOD};
use crate::remote::{FileRemote, HttpRemote, ItemRemote};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::store::{self, ItemStore, SharedStore};

/// Shared flag telling async work whether its session is still alive
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the session as ended
    pub fn end(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Tunables for a session
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub mode: SyncMode,
    pub quiet_period: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Remote,
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.mode,
            quiet_period: config.quiet_period(),
        }
    }
}

/// One editing session over the item collection
pub struct Session {
    pub(crate) store: SharedStore,
    pub(crate) remote: Arc<dyn ItemRemote>,
    pub(crate) queue: WriteQueue,
    pub(crate) mode: SyncMode,
    liveness: Liveness,
}

impl Session {
    /// Create a session over `remote`, deferring flushes with `scheduler`
    pub fn new(
        remote: Arc<dyn ItemRemote>,
        scheduler: Arc<dyn Scheduler>,
        options: SessionOptions,
    ) -> Self {
        let store = ItemStore::shared();
        let queue = WriteQueue::new(
            store.clone(),
            remote.clone(),
            scheduler,
            options.quiet_period,
            options.mode,
        );

        Self {
            store,
            remote,
            queue,
            mode: options.mode,
            liveness: Liveness::new(),
        }
    }

    /// Create a session from configuration, on the tokio clock
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote: Arc<dyn ItemRemote> = match config.backend {
            Backend::Http => Arc::new(
                HttpRemote::new(&config.api_url, config.request_timeout())
                    .context("Failed to create HTTP client")?,
            ),
            Backend::File => Arc::new(FileRemote::new(config.store_path())),
        };

        info!(
            "Session: backend={:?} mode={:?} quiet_period={:?}",
            config.backend,
            config.mode,
            config.quiet_period()
        );

        Ok(Self::new(
            remote,
            Arc::new(TokioScheduler::new()),
            SessionOptions::from(config),
        ))
    }

    // ==================== Lifecycle ====================

    /// Load the initial collection (see `BootstrapLoader`)
    ///
    /// Runs once per session; repeated calls return `None` and send nothing.
    pub async fn bootstrap(&self) -> Option<Status> {
        self.bootstrap_loader().run().await
    }

    /// A loader bound to this session, for running on another task
    pub fn bootstrap_loader(&self) -> BootstrapLoader {
        BootstrapLoader::new(
            self.store.clone(),
            self.remote.clone(),
            self.mode,
            self.liveness.clone(),
        )
    }

    pub fn is_active(&self) -> bool {
        self.liveness.is_alive()
    }

    /// End the session without sending pending edits
    ///
    /// An in-flight bootstrap will not touch the store, and flush timers
    /// that have not fired are cancelled. Returns how many pending entries
    /// were dropped.
    pub fn teardown(&self) -> usize {
        {
            // Taken so a bootstrap result is either applied before this or not at all
            let _store = store::lock(&self.store);
            self.liveness.end();
        }
        self.queue.cancel_all()
    }

    /// Send every pending edit, then end the session
    ///
    /// Returns true when every write succeeded.
    pub async fn close(&self) -> bool {
        let ok = self.queue.flush_all().await;
        self.teardown();
        ok
    }

    // ==================== Edits ====================

    /// Apply an edit now and write it to the remote after the quiet period
    ///
    /// With `TokioScheduler` (as built by `from_config`) this must be called
    /// from within a tokio runtime, since the flush timer is a spawned task.
    pub fn update(&self, id: &ItemId, patch: ItemPatch) {
        self.queue.update(id, patch);
    }

    /// Re-send the full editable state of an item
    ///
    /// Returns false when the item is not in the collection. Same runtime
    /// requirement as `update`.
    pub fn save(&self, id: &ItemId) -> bool {
        let patch = match store::lock(&self.store).get(id) {
            Some(item) => item.to_patch(),
            None => return false,
        };
        self.queue.update(id, patch);
        true
    }

    /// Set the selection hint
    pub fn select(&self, id: impl Into<ItemId>) {
        store::lock(&self.store).select(id);
    }

    // ==================== Reads ====================

    pub fn items(&self) -> Vec<Item> {
        store::lock(&self.store).items().to_vec()
    }

    pub fn get(&self, id: &ItemId) -> Option<Item> {
        store::lock(&self.store).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        store::lock(&self.store).len()
    }

    pub fn is_empty(&self) -> bool {
        store::lock(&self.store).is_empty()
    }

    pub fn current_item(&self) -> Option<Item> {
        store::lock(&self.store).current_item().cloned()
    }

    pub fn selected_id(&self) -> Option<ItemId> {
        store::lock(&self.store).selected_id().cloned()
    }

    pub fn status(&self) -> Status {
        store::lock(&self.store).status()
    }

    pub fn last_error(&self) -> Option<SyncFailure> {
        store::lock(&self.store).last_error().cloned()
    }

    pub fn is_unsynced(&self, id: &ItemId) -> bool {
        store::lock(&self.store).is_unsynced(id)
    }

    pub fn unsynced_ids(&self) -> Vec<ItemId> {
        store::lock(&self.store).unsynced_ids()
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn queue(&self) -> &WriteQueue {
        &self.queue
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("queue", &self.queue)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
