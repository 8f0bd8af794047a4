//! JSON file item collection
//!
//! Stores the collection as a single JSON document, the same shape the item
//! server keeps on disk:
//!
//! ```text
//! { "nextId": 3, "updatedAt": "2024-05-01T10:00:00Z", "items": [ ... ] }
//! ```
//!
//! Uses atomic writes (write to temp file, then rename) so the document is
//! never left partially written. Disk access runs on tokio's blocking pool.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ItemRemote;
use crate::error::{RemoteError, RemoteResult};
use crate::models::{Item, ItemId, ItemPatch, NewItem};

/// Name given to items created without one
const FALLBACK_NAME: &str = "NEW_CODE";

/// Category given to items created without one
const FALLBACK_KIND: &str = "UI";

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(rename = "nextId", default = "first_id")]
    next_id: u64,
    #[serde(rename = "updatedAt", default = "Utc::now")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    items: Vec<Item>,
}

fn first_id() -> u64 {
    1
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            updated_at: Utc::now(),
            items: Vec::new(),
        }
    }
}

/// File-backed implementation of `ItemRemote`
///
/// Clones share the same lock.
#[derive(Debug, Clone)]
pub struct FileRemote {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Arc<Mutex<()>>,
}

impl FileRemote {
    /// Use the document at `path`; it is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> RemoteResult<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| RemoteError::from_io(e, self.path.clone(), false))?;

        serde_json::from_str(&content).map_err(|e| RemoteError::InvalidFormat {
            path: self.path.clone(),
            details: e.to_string(),
        })
    }

    fn save(&self, doc: &mut StoreDocument) -> RemoteResult<()> {
        doc.updated_at = Utc::now();
        let json = serde_json::to_vec_pretty(doc)?;
        atomic_write(&self.path, &json)
    }

    /// Run a read-modify-write cycle under the process-local lock
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> RemoteResult<T>,
    ) -> RemoteResult<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.load()?;
        let result = f(&mut doc)?;
        self.save(&mut doc)?;
        Ok(result)
    }

    fn read_items(&self) -> RemoteResult<Vec<Item>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.items)
    }

    fn create_item(&self, item: &NewItem) -> RemoteResult<Item> {
        self.modify(|doc| {
            let id = ItemId::new(doc.next_id.to_string());
            doc.next_id += 1;

            let mut new = item.clone();
            if new.name.is_empty() {
                new.name = FALLBACK_NAME.to_string();
            }
            if new.kind.is_empty() {
                new.kind = FALLBACK_KIND.to_string();
            }

            let created = new.into_item(id);
            debug!("Stored item {} in {:?}", created.id, self.path);
            doc.items.push(created.clone());
            Ok(created)
        })
    }

    fn update_item(&self, id: &ItemId, patch: &ItemPatch) -> RemoteResult<()> {
        self.modify(|doc| {
            let item = doc
                .items
                .iter_mut()
                .find(|item| &item.id == id)
                .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
            item.apply(patch);
            Ok(())
        })
    }

    fn delete_item(&self, id: &ItemId) -> RemoteResult<()> {
        self.modify(|doc| {
            let pos = doc
                .items
                .iter()
                .position(|item| &item.id == id)
                .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
            doc.items.remove(pos);
            Ok(())
        })
    }

    /// Run `f` against a clone of this remote on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> RemoteResult<T>
    where
        T: Send + 'static,
        F: FnOnce(FileRemote) -> RemoteResult<T> + Send + 'static,
    {
        let remote = self.clone();
        tokio::task::spawn_blocking(move || f(remote)).await?
    }
}

#[async_trait]
impl ItemRemote for FileRemote {
    async fn list(&self) -> RemoteResult<Vec<Item>> {
        self.blocking(|remote| remote.read_items()).await
    }

    async fn create(&self, item: &NewItem) -> RemoteResult<Item> {
        let item = item.clone();
        self.blocking(move |remote| remote.create_item(&item)).await
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> RemoteResult<()> {
        let (id, patch) = (id.clone(), patch.clone());
        self.blocking(move |remote| remote.update_item(&id, &patch)).await
    }

    async fn delete(&self, id: &ItemId) -> RemoteResult<()> {
        let id = id.clone();
        self.blocking(move |remote| remote.delete_item(&id)).await
    }
}

/// Write data to a file atomically
fn atomic_write(path: &Path, data: &[u8]) -> RemoteResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| RemoteError::from_io(e, parent.to_path_buf(), true))?;
        }
    }

    let temp_path = path.with_extension("tmp");

    write_synced(&temp_path, data).map_err(|e| RemoteError::from_io(e, temp_path.clone(), true))?;

    fs::rename(&temp_path, path).map_err(|source| RemoteError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source,
    })
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}
