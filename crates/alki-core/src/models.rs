//! Data models for Alki
//!
//! Defines the core data structures: Item, ItemPatch and NewItem.
//! Field names on the wire follow the remote collection's JSON contract
//! (`type`, `createdAt`), while the Rust names stay idiomatic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque item identifier, assigned by the remote collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id never addresses an item
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One editable artifact in the collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique identifier
    pub id: ItemId,
    /// Display label
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Free-form category (e.g. "UI")
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind: String,
    /// HTML fragment
    #[serde(default, deserialize_with = "null_as_empty")]
    pub html: String,
    /// CSS fragment
    #[serde(default, deserialize_with = "null_as_empty")]
    pub css: String,
    /// JavaScript fragment
    #[serde(default, deserialize_with = "null_as_empty")]
    pub js: String,
    /// Combined-source override; when non-empty it replaces the three fragments
    #[serde(default, deserialize_with = "null_as_empty")]
    pub all: String,
    /// Creation time, as stamped by the remote collection
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Create an item with empty sources
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            html: String::new(),
            css: String::new(),
            js: String::new(),
            all: String::new(),
            created_at: None,
        }
    }

    /// Set the category
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the three source fragments
    pub fn with_sources(
        mut self,
        html: impl Into<String>,
        css: impl Into<String>,
        js: impl Into<String>,
    ) -> Self {
        self.html = html.into();
        self.css = css.into();
        self.js = js.into();
        self
    }

    /// Merge the fields present in `patch` into this item
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(ref name) = patch.name {
            self.name = name.clone();
        }
        if let Some(ref kind) = patch.kind {
            self.kind = kind.clone();
        }
        if let Some(ref html) = patch.html {
            self.html = html.clone();
        }
        if let Some(ref css) = patch.css {
            self.css = css.clone();
        }
        if let Some(ref js) = patch.js {
            self.js = js.clone();
        }
        if let Some(ref all) = patch.all {
            self.all = all.clone();
        }
    }

    /// Patch carrying every editable field of this item
    pub fn to_patch(&self) -> ItemPatch {
        ItemPatch {
            name: Some(self.name.clone()),
            kind: Some(self.kind.clone()),
            html: Some(self.html.clone()),
            css: Some(self.css.clone()),
            js: Some(self.js.clone()),
            all: Some(self.all.clone()),
        }
    }

    /// Whether the combined-source override is in effect
    pub fn uses_combined_source(&self) -> bool {
        !self.all.trim().is_empty()
    }
}

/// A partial update to an item
///
/// Absent fields are left untouched and omitted from the wire body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<String>,
}

impl ItemPatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn with_js(mut self, js: impl Into<String>) -> Self {
        self.js = Some(js.into());
        self
    }

    pub fn with_all(mut self, all: impl Into<String>) -> Self {
        self.all = Some(all.into());
        self
    }

    /// Merge a later patch into this one; fields present in `later` win
    pub fn merge(&mut self, later: ItemPatch) {
        if later.name.is_some() {
            self.name = later.name;
        }
        if later.kind.is_some() {
            self.kind = later.kind;
        }
        if later.html.is_some() {
            self.html = later.html;
        }
        if later.css.is_some() {
            self.css = later.css;
        }
        if later.js.is_some() {
            self.js = later.js;
        }
        if later.all.is_some() {
            self.all = later.all;
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.html.is_none()
            && self.css.is_none()
            && self.js.is_none()
            && self.all.is_none()
    }
}

/// Payload for creating an item; the remote collection assigns the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub html: String,
    pub css: String,
    pub js: String,
    pub all: String,
}

impl NewItem {
    /// A named item with empty sources
    pub fn named(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            html: String::new(),
            css: String::new(),
            js: String::new(),
            all: String::new(),
        }
    }

    /// Materialize as an item under the given id
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            kind: self.kind,
            html: self.html,
            css: self.css,
            js: self.js,
            all: self.all,
            created_at: Some(Utc::now()),
        }
    }
}

/// Outcome of the last bootstrap attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Bootstrap has not started
    #[default]
    Idle,
    /// Initial fetch in flight
    Loading,
    /// Collection reflects the remote
    Ready,
    /// Collection is the local seed set
    Offline,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Loading => "loading",
            Status::Ready => "ready",
            Status::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
