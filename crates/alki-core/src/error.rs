//! Remote error handling
//!
//! Provides typed errors for remote collection operations with descriptive
//! messages and recovery suggestions, plus the cloneable failure record kept
//! in the item store's error slot.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::models::ItemId;

/// Errors that can occur while talking to the remote item collection
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The base URL could not be used to address items
    #[error("Invalid collection URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    /// The request never produced a response (connection, timeout, TLS)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{method} '{url}' returned HTTP {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    /// The response body did not match the collection contract
    #[error("Malformed response from '{url}': {details}")]
    InvalidResponse { url: String, details: String },

    /// A creation response did not carry the created item
    #[error("Creation response from '{url}' did not include an item")]
    MissingItem { url: String },

    /// No item with this id exists remotely
    #[error("Item '{0}' not found")]
    NotFound(ItemId),

    /// The remote is deliberately unreachable (in-memory failure injection)
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// The blocking file store task panicked or was cancelled
    #[error("File store task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// Permission denied accessing the file store
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read the file store
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write the file store
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File store document cannot be parsed
    #[error("Invalid store document in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemoteError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind.
    pub fn from_io(error: io::Error, path: PathBuf, writing: bool) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => RemoteError::PermissionDenied {
                path,
                source: error,
            },
            _ if writing => RemoteError::WriteError {
                path,
                source: error,
            },
            _ => RemoteError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Whether the same request might succeed later without changes
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            RemoteError::Unavailable(_) => true,
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            RemoteError::Transport(_) | RemoteError::Unavailable(_) => {
                Some("Check that the item server is running and `api_url` points at it.")
            }
            RemoteError::Status { status, .. } if *status >= 500 => {
                Some("The item server reported an internal error; check its logs.")
            }
            RemoteError::InvalidUrl { .. } => {
                Some("Set a full URL, e.g. `alki config set api_url http://localhost:4177/api/items`.")
            }
            RemoteError::PermissionDenied { .. } => {
                Some("Check file and directory permissions for the data directory.")
            }
            RemoteError::InvalidFormat { .. } => {
                Some("The store file is not valid JSON. Restore it from a backup or remove it to start fresh.")
            }
            _ => None,
        }
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Which engine operation a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Initial collection fetch
    Load,
    /// Coalesced flush of local edits
    Write,
    /// Item creation
    Create,
    /// Item deletion
    Delete,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Load => "load",
            FailureKind::Write => "write",
            FailureKind::Create => "create",
            FailureKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A recorded, non-fatal failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub item_id: Option<ItemId>,
    pub message: String,
}

impl SyncFailure {
    pub fn new(kind: FailureKind, item_id: Option<ItemId>, error: &RemoteError) -> Self {
        Self {
            kind,
            item_id,
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.item_id {
            Some(ref id) => write!(f, "{} failed for item {}: {}", self.kind, id, self.message),
            None => write!(f, "{} failed: {}", self.kind, self.message),
        }
    }
}
