//! In-memory item store
//!
//! The `ItemStore` is the single source of truth for a session:
//! - the ordered collection of items
//! - the selection hint (`selected_id`)
//! - the bootstrap status and the last recorded failure
//!
//! Every mutation is synchronous and infallible. Network work lives in the
//! write queue and the CRUD operations, which call into the store only when
//! they have something to apply.
//!
//! ## Selection
//!
//! The selection is a hint, not a pointer. `current_item` resolves it to the
//! matching item, or to the first item when the id has gone away.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::SyncFailure;
use crate::models::{Item, ItemId, ItemPatch, Status};

/// Store shared between the session, its write queue and scheduled flushes
pub type SharedStore = Arc<Mutex<ItemStore>>;

/// Lock a shared store
///
/// The store has no invariants that a panicking writer could break halfway,
/// so a poisoned lock is recovered.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, ItemStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collection, selection and status for one editing session
#[derive(Debug, Default)]
pub struct ItemStore {
    /// Items in insertion order
    items: Vec<Item>,
    /// Selection hint
    selected_id: Option<ItemId>,
    /// Outcome of the last bootstrap
    status: Status,
    /// Most recent non-fatal failure
    last_error: Option<SyncFailure>,
    /// Items whose last flush failed
    unsynced: HashSet<ItemId>,
    /// Items with a remove in progress
    removing: HashSet<ItemId>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new store for sharing
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    // ==================== Mutations ====================

    /// Swap the whole collection and select its first item
    pub fn replace_collection(&mut self, items: Vec<Item>) {
        self.selected_id = items.first().map(|item| item.id.clone());
        self.items = items;
        self.unsynced.clear();
        self.removing.clear();
    }

    /// Merge `patch` into the item with this id; unknown ids are ignored
    pub fn apply_local_patch(&mut self, id: &ItemId, patch: &ItemPatch) {
        if let Some(item) = self.items.iter_mut().find(|item| &item.id == id) {
            item.apply(patch);
        }
    }

    /// Set the selection hint without checking that the id exists
    pub fn select(&mut self, id: impl Into<ItemId>) {
        self.selected_id = Some(id.into());
    }

    /// Clear the selection hint
    pub fn clear_selection(&mut self) {
        self.selected_id = None;
    }

    /// Append an item
    ///
    /// An item whose id is already present replaces the existing entry in
    /// place so ids stay unique.
    pub fn append(&mut self, item: Item) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            warn!("Item {} already in collection, replacing", item.id);
            *existing = item;
        } else {
            self.items.push(item);
        }
    }

    /// Remove an item, returning it if present
    ///
    /// When the removed item was selected, the selection moves to the first
    /// remaining item.
    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        let pos = self.items.iter().position(|item| &item.id == id)?;
        let removed = self.items.remove(pos);
        self.unsynced.remove(id);
        self.removing.remove(id);

        if self.selected_id.as_ref() == Some(id) {
            self.selected_id = self.items.first().map(|item| item.id.clone());
        }

        Some(removed)
    }

    /// Claim an item for removal
    ///
    /// Fails when the item is unknown, already being removed, or would be the
    /// last one left once every claimed removal completes.
    pub fn reserve_removal(&mut self, id: &ItemId) -> bool {
        if !self.contains(id) || self.removing.contains(id) {
            return false;
        }
        if self.items.len() - self.removing.len() <= 1 {
            return false;
        }
        self.removing.insert(id.clone());
        true
    }

    /// Give up a claim taken with `reserve_removal`
    pub fn release_removal(&mut self, id: &ItemId) {
        self.removing.remove(id);
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn record_error(&mut self, failure: SyncFailure) {
        self.last_error = Some(failure);
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Record a failed flush and mark the item as diverged from the remote
    pub fn record_write_failure(&mut self, id: &ItemId, failure: SyncFailure) {
        self.unsynced.insert(id.clone());
        self.last_error = Some(failure);
    }

    /// A flush for this item succeeded
    pub fn mark_synced(&mut self, id: &ItemId) {
        self.unsynced.remove(id);
    }

    // ==================== Reads ====================

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_id(&self) -> Option<&ItemId> {
        self.selected_id.as_ref()
    }

    /// The selected item, falling back to the first item
    pub fn current_item(&self) -> Option<&Item> {
        self.selected_id
            .as_ref()
            .and_then(|id| self.get(id))
            .or_else(|| self.items.first())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_error(&self) -> Option<&SyncFailure> {
        self.last_error.as_ref()
    }

    /// Whether local edits to this item failed to reach the remote
    pub fn is_unsynced(&self, id: &ItemId) -> bool {
        self.unsynced.contains(id)
    }

    /// Ids of all items with unsynced local edits, in collection order
    pub fn unsynced_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| self.unsynced.contains(&item.id))
            .map(|item| item.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, RemoteError};

    fn three() -> ItemStore {
        let mut store = ItemStore::new();
        store.replace_collection(vec![
            Item::new("a", "Alpha"),
            Item::new("b", "Beta"),
            Item::new("c", "Gamma"),
        ]);
        store
    }

    #[test]
    fn test_replace_collection_selects_first() {
        let store = three();
        assert_eq!(store.len(), 3);
        assert_eq!(store.selected_id(), Some(&ItemId::from("a")));
        assert_eq!(store.current_item().unwrap().name, "Alpha");
    }

    #[test]
    fn test_replace_with_empty_clears_selection() {
        let mut store = three();
        store.replace_collection(Vec::new());
        assert!(store.selected_id().is_none());
        assert!(store.current_item().is_none());
    }

    #[test]
    fn test_apply_local_patch() {
        let mut store = three();
        store.apply_local_patch(&"b".into(), &ItemPatch::default().with_html("<p>"));
        assert_eq!(store.get(&"b".into()).unwrap().html, "<p>");
        assert_eq!(store.get(&"a".into()).unwrap().html, "");
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut store = three();
        let before: Vec<_> = store.items().to_vec();

        store.apply_local_patch(&"zzz".into(), &ItemPatch::default().with_name("X"));
        store.select("zzz");

        assert_eq!(store.items(), &before[..]);
        // Stale selection degrades to the first item
        assert_eq!(store.selected_id(), Some(&ItemId::from("zzz")));
        assert_eq!(store.current_item().unwrap().id, ItemId::from("a"));
    }

    #[test]
    fn test_removal_claims_keep_one_item() {
        let mut store = three();

        assert!(store.reserve_removal(&"a".into()));
        assert!(!store.reserve_removal(&"a".into()));
        assert!(store.reserve_removal(&"b".into()));
        assert!(!store.reserve_removal(&"c".into()));
        assert!(!store.reserve_removal(&"zzz".into()));

        store.release_removal(&"b".into());
        store.remove(&"a".into());
        assert_eq!(store.len(), 2);
        assert!(!store.reserve_removal(&"a".into()));
        assert!(store.reserve_removal(&"c".into()));
        assert!(!store.reserve_removal(&"b".into()));
    }

    #[test]
    fn test_select_existing() {
        let mut store = three();
        store.select("c");
        assert_eq!(store.current_item().unwrap().name, "Gamma");
    }

    #[test]
    fn test_remove_selected_moves_selection() {
        let mut store = three();
        store.select("a");

        let removed = store.remove(&"a".into()).unwrap();
        assert_eq!(removed.name, "Alpha");
        assert_eq!(store.selected_id(), Some(&ItemId::from("b")));
        assert!(!store.contains(&"a".into()));
    }

    #[test]
    fn test_remove_unselected_keeps_selection() {
        let mut store = three();
        store.select("c");
        store.remove(&"a".into());
        assert_eq!(store.selected_id(), Some(&ItemId::from("c")));
        assert!(store.remove(&"missing".into()).is_none());
    }

    #[test]
    fn test_append_keeps_ids_unique() {
        let mut store = three();
        store.append(Item::new("d", "Delta"));
        store.append(Item::new("b", "Beta 2"));

        assert_eq!(store.len(), 4);
        assert_eq!(store.get(&"b".into()).unwrap().name, "Beta 2");
        assert_eq!(store.items()[3].id, ItemId::from("d"));
    }

    #[test]
    fn test_unsynced_tracking() {
        let mut store = three();
        let err = RemoteError::Unavailable("offline".into());
        let id = ItemId::from("b");

        store.record_write_failure(&id, SyncFailure::new(FailureKind::Write, Some(id.clone()), &err));
        assert!(store.is_unsynced(&id));
        assert_eq!(store.unsynced_ids(), vec![id.clone()]);
        assert_eq!(store.last_error().unwrap().kind, FailureKind::Write);

        store.mark_synced(&id);
        assert!(!store.is_unsynced(&id));
        // The error slot is not cleared by a later success
        assert!(store.last_error().is_some());
    }

    #[test]
    fn test_status() {
        let mut store = ItemStore::new();
        assert_eq!(store.status(), Status::Idle);
        store.set_status(Status::Offline);
        assert_eq!(store.status(), Status::Offline);
    }
}
