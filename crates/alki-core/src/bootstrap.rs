//! Bootstrap loader
//!
//! Establishes the session's initial collection, once:
//!
//! - remote returns items → use them, status `ready`
//! - remote returns nothing → seed set, status `ready`
//! - remote fails → seed set, status `offline`, failure recorded
//!
//! The first item is selected in every case. A result that arrives after the
//! session was torn down is discarded, and a store is only ever loaded once.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SyncMode;
use crate::error::{FailureKind, SyncFailure};
use crate::models::Status;
use crate::remote::ItemRemote;
use crate::seed::seed_items;
use crate::session::Liveness;
use crate::store::{self, SharedStore};

/// One-shot initial load of the item collection
pub struct BootstrapLoader {
    store: SharedStore,
    remote: Arc<dyn ItemRemote>,
    mode: SyncMode,
    liveness: Liveness,
}

impl BootstrapLoader {
    pub fn new(
        store: SharedStore,
        remote: Arc<dyn ItemRemote>,
        mode: SyncMode,
        liveness: Liveness,
    ) -> Self {
        Self {
            store,
            remote,
            mode,
            liveness,
        }
    }

    /// Run the load
    ///
    /// Returns the resulting status, or `None` if the session ended first and
    /// the result was discarded. Only the first load of a store does anything;
    /// later runs return `None` without a request.
    pub async fn run(self) -> Option<Status> {
        {
            let mut store = store::lock(&self.store);
            if !self.liveness.is_alive() {
                return None;
            }
            if store.status() != Status::Idle {
                debug!("Collection already loaded, skipping bootstrap");
                return None;
            }

            if self.mode == SyncMode::Local {
                store.replace_collection(seed_items());
                store.set_status(Status::Offline);
                info!("Local mode: using {} seed item(s)", store.len());
                return Some(Status::Offline);
            }

            store.set_status(Status::Loading);
        }

        let result = self.remote.list().await;

        let mut store = store::lock(&self.store);
        if !self.liveness.is_alive() {
            debug!("Session ended during bootstrap, discarding result");
            return None;
        }

        match result {
            Ok(items) => {
                let items = if items.is_empty() {
                    info!("Remote collection is empty, using seed items");
                    seed_items()
                } else {
                    items
                };
                info!("Loaded {} item(s)", items.len());
                store.replace_collection(items);
                store.set_status(Status::Ready);
                Some(Status::Ready)
            }
            Err(e) => {
                warn!("Failed to load items, working offline: {}", e);
                store.replace_collection(seed_items());
                store.set_status(Status::Offline);
                store.record_error(SyncFailure::new(FailureKind::Load, None, &e));
                Some(Status::Offline)
            }
        }
    }
}
