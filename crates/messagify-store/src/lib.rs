//! # messagify-store
//!
//! In-memory message storage for the Messagify sync core.
//!
//! A [`MessageCache`] owns one [`MessageLog`] per conversation. Every
//! operation is synchronous and total: mutations against an unknown
//! conversation or message are no-ops, never errors.

pub mod cache;
pub mod log;

pub use cache::MessageCache;
pub use log::MessageLog;
