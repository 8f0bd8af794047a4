//! In-memory item collection
//!
//! Behaves like the REST service (sequential ids, not-found errors) and keeps
//! a log of every request it receives. Individual operations can be told to
//! fail, which is how tests exercise the offline and error paths.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::ItemRemote;
use crate::error::{RemoteError, RemoteResult};
use crate::models::{Item, ItemId, ItemPatch, NewItem};

/// Remote operations, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

/// A request as received by the in-memory remote
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    List,
    Create(NewItem),
    Update(ItemId, ItemPatch),
    Delete(ItemId),
}

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<Item>,
    next_id: u64,
    failing: HashSet<Operation>,
    requests: Vec<Request>,
}

/// In-process implementation of `ItemRemote`
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl MemoryRemote {
    /// An empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection pre-populated with `items`
    ///
    /// New ids continue after the largest numeric id present.
    pub fn with_items(items: Vec<Item>) -> Self {
        let next_id = items
            .iter()
            .filter_map(|item| item.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        Self {
            state: Mutex::new(MemoryState {
                items,
                next_id,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make an operation fail (or succeed again)
    pub fn set_failing(&self, op: Operation, failing: bool) {
        let mut state = self.state();
        if failing {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    /// Make every operation fail
    pub fn fail_all(&self) {
        for op in [
            Operation::List,
            Operation::Create,
            Operation::Update,
            Operation::Delete,
        ] {
            self.set_failing(op, true);
        }
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    /// Only the update requests, in order
    pub fn updates(&self) -> Vec<(ItemId, ItemPatch)> {
        self.state()
            .requests
            .iter()
            .filter_map(|req| match req {
                Request::Update(id, patch) => Some((id.clone(), patch.clone())),
                _ => None,
            })
            .collect()
    }

    /// Snapshot of the stored items
    pub fn items(&self) -> Vec<Item> {
        self.state().items.clone()
    }

    fn begin(&self, op: Operation, request: Request) -> RemoteResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.state();
        state.requests.push(request);
        if state.failing.contains(&op) {
            return Err(RemoteError::Unavailable(format!("{:?} rejected", op)));
        }
        Ok(state)
    }
}

#[async_trait]
impl ItemRemote for MemoryRemote {
    async fn list(&self) -> RemoteResult<Vec<Item>> {
        let state = self.begin(Operation::List, Request::List)?;
        Ok(state.items.clone())
    }

    async fn create(&self, item: &NewItem) -> RemoteResult<Item> {
        let mut state = self.begin(Operation::Create, Request::Create(item.clone()))?;
        state.next_id += 1;
        let created = item.clone().into_item(ItemId::new(state.next_id.to_string()));
        state.items.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> RemoteResult<()> {
        let mut state = self.begin(
            Operation::Update,
            Request::Update(id.clone(), patch.clone()),
        )?;
        let item = state
            .items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        item.apply(patch);
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> RemoteResult<()> {
        let mut state = self.begin(Operation::Delete, Request::Delete(id.clone()))?;
        let pos = state
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        state.items.remove(pos);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let remote = MemoryRemote::with_items(vec![Item::new("4", "Four")]);

        let a = remote.create(&NewItem::named("A", "UI")).await.unwrap();
        let b = remote.create(&NewItem::named("B", "UI")).await.unwrap();

        assert_eq!(a.id.as_str(), "5");
        assert_eq!(b.id.as_str(), "6");
        assert!(a.created_at.is_some());
        assert_eq!(remote.items().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let remote = MemoryRemote::with_items(vec![Item::new("1", "One")]);
        let id = ItemId::from("1");

        remote
            .update(&id, &ItemPatch::default().with_js("run()"))
            .await
            .unwrap();
        assert_eq!(remote.items()[0].js, "run()");

        remote.delete(&id).await.unwrap();
        assert!(remote.items().is_empty());

        let err = remote.delete(&id).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_injection_is_logged() {
        let remote = MemoryRemote::new();
        remote.set_failing(Operation::List, true);

        assert!(remote.list().await.is_err());
        assert_eq!(remote.requests(), vec![Request::List]);

        remote.set_failing(Operation::List, false);
        assert!(remote.list().await.unwrap().is_empty());
    }
}
