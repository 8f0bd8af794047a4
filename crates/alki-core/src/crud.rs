//! Add and remove operations
//!
//! Unlike edits, structural changes wait for the remote: an item is appended
//! only once the remote has assigned its id, and removed only once the
//! remote has confirmed the delete. In local mode neither touches the network.

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SyncMode;
use crate::error::{FailureKind, SyncFailure};
use crate::models::{Item, ItemId, NewItem};
use crate::seed::{default_name, DEFAULT_KIND};
use crate::session::Session;
use crate::store;

impl Session {
    /// Create an item of the default type
    ///
    /// An absent or blank name is replaced with the next free
    /// `"UI Asset N"`. Returns the stored item, now selected, or `None` when
    /// the remote refused it.
    pub async fn add(&self, name: Option<&str>) -> Option<Item> {
        self.add_with_type(name, DEFAULT_KIND).await
    }

    /// Create an item with an explicit type
    pub async fn add_with_type(&self, name: Option<&str>, kind: &str) -> Option<Item> {
        let new_item = {
            let store = store::lock(&self.store);
            let name = match name.map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => default_name(store.items()),
            };
            let kind = if kind.trim().is_empty() { DEFAULT_KIND } else { kind };
            NewItem::named(name, kind)
        };

        let item = match self.mode {
            SyncMode::Local => new_item.into_item(ItemId::new(Uuid::new_v4().to_string())),
            SyncMode::Remote => match self.remote.create(&new_item).await {
                Ok(item) => item,
                Err(e) => {
                    warn!("Failed to create item {:?}: {}", new_item.name, e);
                    store::lock(&self.store)
                        .record_error(SyncFailure::new(FailureKind::Create, None, &e));
                    return None;
                }
            },
        };

        info!("Added item {} ({})", item.id, item.name);
        let mut store = store::lock(&self.store);
        store.append(item.clone());
        store.select(item.id.clone());
        Some(item)
    }

    /// Remove an item once the remote confirms the delete
    ///
    /// Refused without a request when the id is unknown, already being
    /// removed, or the item would be the last one left counting removes still
    /// in flight. In local mode this is `remove_local`.
    pub async fn remove(&self, id: &ItemId) -> bool {
        if self.mode == SyncMode::Local {
            return self.remove_local(id);
        }

        if !self.reserve_removal(id) {
            return false;
        }

        match self.remote.delete(id).await {
            Ok(()) => {
                self.queue.discard(id);
                store::lock(&self.store).remove(id);
                info!("Removed item {}", id);
                true
            }
            Err(e) => {
                warn!("Failed to delete item {}: {}", id, e);
                let mut store = store::lock(&self.store);
                store.release_removal(id);
                store.record_error(SyncFailure::new(FailureKind::Delete, Some(id.clone()), &e));
                false
            }
        }
    }

    /// Remove an item from the session only
    pub fn remove_local(&self, id: &ItemId) -> bool {
        if !self.reserve_removal(id) {
            return false;
        }

        self.queue.discard(id);
        store::lock(&self.store).remove(id);
        info!("Removed item {} locally", id);
        true
    }

    fn reserve_removal(&self, id: &ItemId) -> bool {
        if id.is_empty() {
            return false;
        }
        let reserved = store::lock(&self.store).reserve_removal(id);
        if !reserved {
            warn!("Refusing to remove item {}", id);
        }
        reserved
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::models::{ItemPatch, Status};
    use crate::remote::{MemoryRemote, Operation, Request};
    use crate::error::RemoteResult;
    use crate::remote::ItemRemote;
    use crate::scheduler::ManualScheduler;
    use crate::session::SessionOptions;
    use async_trait::async_trait;

    async fn session(items: Vec<Item>, mode: SyncMode) -> (Session, Arc<MemoryRemote>, ManualScheduler) {
        let remote = Arc::new(MemoryRemote::with_items(items));
        let scheduler = ManualScheduler::new();
        let session = Session::new(
            remote.clone(),
            Arc::new(scheduler.clone()),
            SessionOptions {
                mode,
                ..SessionOptions::default()
            },
        );
        session.bootstrap().await;
        (session, remote, scheduler)
    }

    fn assets() -> Vec<Item> {
        vec![
            Item::new("1", "UI Asset 1"),
            Item::new("2", "Header"),
            Item::new("3", "UI Asset 3"),
        ]
    }

    #[tokio::test]
    async fn test_add_synthesizes_name() {
        let (session, remote, _) = session(assets(), SyncMode::Remote).await;

        let item = session.add(None).await.unwrap();

        assert_eq!(item.name, "UI Asset 4");
        assert_eq!(item.kind, "UI");
        assert_eq!(item.id.as_str(), "4");
        assert_eq!(session.len(), 4);
        assert_eq!(session.selected_id(), Some(item.id));

        let created = remote
            .requests()
            .into_iter()
            .find_map(|req| match req {
                Request::Create(new) => Some(new),
                _ => None,
            })
            .unwrap();
        assert_eq!(created, NewItem::named("UI Asset 4", "UI"));
    }

    #[tokio::test]
    async fn test_add_blank_name_and_type() {
        let (session, _, _) = session(assets(), SyncMode::Remote).await;

        let item = session.add_with_type(Some("   "), "").await.unwrap();
        assert_eq!(item.name, "UI Asset 4");
        assert_eq!(item.kind, "UI");

        let named = session.add_with_type(Some("Card"), "Layout").await.unwrap();
        assert_eq!(named.name, "Card");
        assert_eq!(named.kind, "Layout");
        assert_eq!(session.current_item().unwrap().name, "Card");
    }

    #[tokio::test]
    async fn test_add_failure_leaves_collection() {
        let (session, remote, _) = session(assets(), SyncMode::Remote).await;
        remote.set_failing(Operation::Create, true);

        assert!(session.add(Some("Card")).await.is_none());

        assert_eq!(session.len(), 3);
        assert_eq!(session.selected_id(), Some(ItemId::from("1")));
        let failure = session.last_error().unwrap();
        assert_eq!(failure.kind, FailureKind::Create);
        assert!(failure.item_id.is_none());
    }

    #[tokio::test]
    async fn test_remove_selected_moves_selection() {
        let (session, remote, _) = session(assets(), SyncMode::Remote).await;

        assert!(session.remove(&ItemId::from("1")).await);

        assert_eq!(session.len(), 2);
        assert_eq!(session.selected_id(), Some(ItemId::from("2")));
        assert_eq!(remote.items().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_last_item_refused() {
        let (session, remote, _) = session(vec![Item::new("1", "Only")], SyncMode::Remote).await;

        assert!(!session.remove(&ItemId::from("1")).await);
        assert!(!session.remove(&ItemId::from("")).await);

        assert_eq!(session.len(), 1);
        assert_eq!(remote.requests(), vec![Request::List]);
    }

    #[tokio::test]
    async fn test_remove_failure_keeps_item() {
        let (session, remote, _) = session(assets(), SyncMode::Remote).await;
        remote.set_failing(Operation::Delete, true);

        assert!(!session.remove(&ItemId::from("2")).await);

        assert_eq!(session.len(), 3);
        let failure = session.last_error().unwrap();
        assert_eq!(failure.kind, FailureKind::Delete);
        assert_eq!(failure.item_id, Some(ItemId::from("2")));
    }

    #[tokio::test]
    async fn test_remove_drops_pending_write() {
        let (session, remote, scheduler) = session(assets(), SyncMode::Remote).await;
        let id = ItemId::from("2");

        session.update(&id, ItemPatch::default().with_html("<hr>"));
        assert!(session.remove(&id).await);
        assert_eq!(session.queue().pending_count(), 0);

        scheduler.advance(Duration::from_secs(1)).await;
        assert!(remote.updates().is_empty());
    }

    #[tokio::test]
    async fn test_remove_local_skips_network() {
        let (session, remote, _) = session(assets(), SyncMode::Remote).await;

        assert!(session.remove_local(&ItemId::from("3")));
        assert!(!session.remove_local(&ItemId::from("3")));

        assert_eq!(session.len(), 2);
        assert_eq!(remote.items().len(), 3);
        assert!(!remote
            .requests()
            .iter()
            .any(|req| matches!(req, Request::Delete(_))));
    }

    #[tokio::test]
    async fn test_local_mode_crud() {
        let (session, remote, scheduler) = session(assets(), SyncMode::Local).await;
        assert_eq!(session.status(), Status::Offline);

        let item = session.add(None).await.unwrap();
        assert_eq!(item.name, "UI Asset 1");
        assert!(Uuid::parse_str(item.id.as_str()).is_ok());
        assert_eq!(session.len(), 3);

        session.update(&item.id, ItemPatch::default().with_css("a {}"));
        scheduler.advance(Duration::from_secs(1)).await;

        assert!(session.remove(&ItemId::from("1")).await);
        assert_eq!(session.len(), 2);
        assert!(remote.requests().is_empty());
    }

    /// Remote whose deletes give up the task once before completing
    struct YieldingDelete(MemoryRemote);

    #[async_trait]
    impl ItemRemote for YieldingDelete {
        async fn list(&self) -> RemoteResult<Vec<Item>> {
            self.0.list().await
        }

        async fn create(&self, item: &NewItem) -> RemoteResult<Item> {
            self.0.create(item).await
        }

        async fn update(&self, id: &ItemId, patch: &ItemPatch) -> RemoteResult<()> {
            self.0.update(id, patch).await
        }

        async fn delete(&self, id: &ItemId) -> RemoteResult<()> {
            tokio::task::yield_now().await;
            self.0.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_overlapping_removes_keep_one_item() {
        let remote = Arc::new(YieldingDelete(MemoryRemote::with_items(vec![
            Item::new("1", "One"),
            Item::new("2", "Two"),
        ])));
        let session = Session::new(
            remote.clone(),
            Arc::new(ManualScheduler::new()),
            SessionOptions::default(),
        );
        session.bootstrap().await;

        let first = ItemId::from("1");
        let second = ItemId::from("2");
        let (a, b) = tokio::join!(session.remove(&first), session.remove(&second));

        assert!(a);
        assert!(!b);
        assert_eq!(session.len(), 1);
        assert_eq!(session.current_item().unwrap().id, second);
        assert_eq!(remote.0.items().len(), 1);
        let deletes = remote
            .0
            .requests()
            .into_iter()
            .filter(|req| matches!(req, Request::Delete(_)))
            .count();
        assert_eq!(deletes, 1);
    }

    #[tokio::test]
    async fn test_failed_remove_releases_claim() {
        let (session, remote, _) = session(
            vec![Item::new("1", "One"), Item::new("2", "Two")],
            SyncMode::Remote,
        )
        .await;
        remote.set_failing(Operation::Delete, true);

        assert!(!session.remove(&ItemId::from("1")).await);

        remote.set_failing(Operation::Delete, false);
        assert!(session.remove(&ItemId::from("2")).await);
        assert_eq!(session.len(), 1);
    }
}
