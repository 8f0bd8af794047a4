//! Alki Core Library
//!
//! This crate provides the item synchronization engine behind the Alki live
//! preview editor: the in-memory collection of HTML/CSS/JS items, and the
//! machinery that keeps it in step with a remote item collection.
//!
//! # Architecture
//!
//! - **ItemStore**: Source of truth for the session (collection, selection, status)
//! - **WriteQueue**: Optimistic local edits, coalesced into debounced remote writes
//! - **ItemRemote**: The remote collection (HTTP, JSON file, or in-memory)
//!
//! Local edits never wait on the network. The store is updated first and the
//! remote write follows after a quiet period.
//!
//! # Quick Start
//!
//! ```text
//! let session = Session::from_config(&Config::load()?)?;
//! session.bootstrap().await;
//!
//! // Edit the current item (coalesced into one PUT)
//! let id = session.current_item().unwrap().id;
//! session.update(&id, ItemPatch::default().with_css("body { color: red }"));
//!
//! // Push pending writes before exiting
//! session.close().await;
//! ```
//!
//! # Modules
//!
//! - `session`: Engine entry point wiring store, queue and remote
//! - `store`: The reconciled collection, selection and status
//! - `queue`: Coalescing write queue
//! - `bootstrap`: One-shot initial load with seed fallback
//! - `crud`: Add and remove operations
//! - `remote`: Remote collection contract and implementations
//! - `scheduler`: Deferred tasks on a real or manual clock
//! - `config`: Application configuration

pub mod bootstrap;
pub mod config;
pub mod crud;
pub mod error;
pub mod models;
pub mod queue;
pub mod remote;
pub mod scheduler;
pub mod seed;
pub mod session;
pub mod store;

pub use config::{Backend, Config, SyncMode};
pub use error::{FailureKind, RemoteError, RemoteResult, SyncFailure};
pub use models::{Item, ItemId, ItemPatch, NewItem, Status};
pub use queue::WriteQueue;
pub use remote::{FileRemote, HttpRemote, ItemRemote, MemoryRemote};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use session::{Session, SessionOptions};
pub use store::ItemStore;
