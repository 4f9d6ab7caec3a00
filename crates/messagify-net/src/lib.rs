//! Transport seams for the Messagify sync core.
//!
//! The core never talks to the network directly. It consumes a
//! [`SnapshotSource`] for pull-based queries and an [`EventSource`] for the
//! push stream. This crate ships a REST implementation of the former and a
//! broadcast-backed implementation of the latter that a gateway bridge (or
//! the CLI's stdin reader) publishes raw notifications into.

pub mod error;
pub mod events;
pub mod http;
pub mod source;

pub use error::NetError;
pub use events::BroadcastEventSource;
pub use http::HttpSnapshotSource;
pub use source::{EventSource, SnapshotSource};
