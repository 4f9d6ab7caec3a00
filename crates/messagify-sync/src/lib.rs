//! Client-side sync core.
//!
//! Keeps a per-conversation message cache consistent with two sources: bulk
//! snapshots fetched on selection, and incremental notifications pushed by
//! the event stream. Also builds the two-level channel tree and tracks which
//! categories are expanded.
//!
//! [`SyncContext`] is the synchronous core. [`spawn_sync_engine`] runs one in
//! a tokio task and hands back a [`SyncHandle`].

pub mod context;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod listener;
pub mod reconciler;
pub mod tree;
pub mod view_state;

pub use context::{SyncContext, SyncStats};
pub use engine::{spawn_sync_engine, EngineConfig, SyncHandle};
pub use error::SyncError;
pub use fetch::{ConversationView, FetchOutcome, FetchTicket, SnapshotFetchCoordinator};
pub use listener::{ListenerId, ListenerRegistry};
pub use reconciler::{EventReconciler, ReconcileOutcome, ReconcilerStats};
pub use tree::{CategoryNode, ChannelTree};
pub use view_state::{ViewState, ViewStateController};
