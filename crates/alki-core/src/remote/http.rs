//! REST client for the item collection
//!
//! Talks JSON to a collection resource such as
//! `http://localhost:4177/api/items`; single items live at `<base>/<id>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use super::{ItemEnvelope, ItemRemote, ItemsEnvelope};
use crate::error::{RemoteError, RemoteResult};
use crate::models::{Item, ItemId, ItemPatch, NewItem};

/// HTTP implementation of `ItemRemote`
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base: Url,
}

impl HttpRemote {
    /// Create a client for the collection at `base_url`
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let base = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            details: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl {
                url: base_url.to_string(),
                details: "URL cannot address sub-resources".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("alki/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base })
    }

    /// The collection URL
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL of a single item
    pub fn item_url(&self, id: &ItemId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }

    fn check(method: &'static str, response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::Status {
                method,
                url: response.url().to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ItemRemote for HttpRemote {
    async fn list(&self) -> RemoteResult<Vec<Item>> {
        debug!("GET {}", self.base);
        let response = self.client.get(self.base.clone()).send().await?;
        let response = Self::check("GET", response)?;

        let envelope: ItemsEnvelope =
            response
                .json()
                .await
                .map_err(|e| RemoteError::InvalidResponse {
                    url: self.base.to_string(),
                    details: e.to_string(),
                })?;

        Ok(envelope.items.unwrap_or_default())
    }

    async fn create(&self, item: &NewItem) -> RemoteResult<Item> {
        debug!("POST {} name={:?}", self.base, item.name);
        let response = self
            .client
            .post(self.base.clone())
            .json(item)
            .send()
            .await?;
        let response = Self::check("POST", response)?;

        let envelope: ItemEnvelope =
            response
                .json()
                .await
                .map_err(|e| RemoteError::InvalidResponse {
                    url: self.base.to_string(),
                    details: e.to_string(),
                })?;

        envelope.item.ok_or_else(|| RemoteError::MissingItem {
            url: self.base.to_string(),
        })
    }

    async fn update(&self, id: &ItemId, patch: &ItemPatch) -> RemoteResult<()> {
        let url = self.item_url(id);
        debug!("PUT {}", url);
        let response = self.client.put(url).json(patch).send().await?;
        Self::check("PUT", response)?;
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> RemoteResult<()> {
        let url = self.item_url(id);
        debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        Self::check("DELETE", response)?;
        Ok(())
    }
}
