//! Remote item collection
//!
//! The engine only sees the remote through the `ItemRemote` contract:
//!
//! - `list`   → every stored item (`GET /items`)
//! - `create` → the stored item with its assigned id (`POST /items`)
//! - `update` → success or failure for a partial patch (`PUT /items/{id}`)
//! - `delete` → success or failure (`DELETE /items/{id}`)
//!
//! Any backend satisfying the contract is substitutable:
//!
//! - `HttpRemote`: the REST service the editor normally talks to
//! - `FileRemote`: a JSON document on local disk
//! - `MemoryRemote`: in-process, with failure injection for tests

mod file;
mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteResult;
use crate::models::{Item, ItemId, ItemPatch, NewItem};

pub use file::FileRemote;
pub use http::HttpRemote;
pub use memory::{MemoryRemote, Operation, Request};

/// Contract for the remote item collection
#[async_trait]
pub trait ItemRemote: Send + Sync {
    /// Fetch the stored collection; an empty list means "no data"
    async fn list(&self) -> RemoteResult<Vec<Item>>;

    /// Create an item and return it with its assigned id
    async fn create(&self, item: &NewItem) -> RemoteResult<Item>;

    /// Apply a partial update to a stored item
    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> RemoteResult<()>;

    /// Delete a stored item
    async fn delete(&self, id: &ItemId) -> RemoteResult<()>;
}

/// Body of a collection response: `{ "items": [...] }`
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ItemsEnvelope {
    #[serde(default)]
    pub items: Option<Vec<Item>>,
}

/// Body of a creation response: `{ "item": {...} }`
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ItemEnvelope {
    #[serde(default)]
    pub item: Option<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_envelope_tolerates_missing_and_null() {
        let missing: ItemsEnvelope = serde_json::from_str(r#"{"updatedAt":"x"}"#).unwrap();
        assert!(missing.items.is_none());

        let null: ItemsEnvelope = serde_json::from_str(r#"{"items":null}"#).unwrap();
        assert!(null.items.is_none());

        let some: ItemsEnvelope =
            serde_json::from_str(r#"{"items":[{"id":"1","name":"A"}]}"#).unwrap();
        assert_eq!(some.items.unwrap().len(), 1);
    }

    #[test]
    fn test_item_envelope() {
        let env: ItemEnvelope = serde_json::from_str(r#"{"item":{"id":"5","name":"N"}}"#).unwrap();
        assert_eq!(env.item.unwrap().id, ItemId::from("5"));

        let empty: ItemEnvelope = serde_json::from_str("{}").unwrap();
        assert!(empty.item.is_none());
    }
}
