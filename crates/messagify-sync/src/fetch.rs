//! Snapshot requests for the active conversation.
//!
//! Every request is stamped with a [`FetchTicket`]. A result is committed
//! only while its ticket is still current: same conversation and same
//! generation. Anything else is a stale result and is discarded on arrival;
//! the in-flight request itself is never aborted.

use std::fmt::Display;

use serde::Serialize;
use tracing::{debug, info, warn};

use messagify_shared::{ChannelId, Message};
use messagify_store::MessageCache;

/// Stamp carried by an in-flight snapshot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub conversation: ChannelId,
    pub generation: u64,
}

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Committed { count: usize },
    Failed,
    Stale,
}

/// Loading/error state of the active conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationView {
    pub conversation: Option<ChannelId>,
    pub loading: bool,
    pub error: Option<String>,
    /// Cached messages of the active conversation, newest first.
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub committed: u64,
    pub failed: u64,
    pub stale: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotFetchCoordinator {
    active: Option<ChannelId>,
    generation: u64,
    loading: bool,
    error: Option<String>,
    stats: FetchStats,
}

impl SnapshotFetchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the active conversation.
    ///
    /// Returns the ticket of the request to issue, if any. `None` clears
    /// loading and error state and issues nothing; re-selecting the active
    /// conversation issues nothing either.
    pub fn select_conversation(&mut self, target: Option<ChannelId>) -> Option<FetchTicket> {
        match target {
            None => {
                if let Some(previous) = self.active.take() {
                    debug!(conversation = %previous, "Conversation deselected");
                }
                // Invalidate whatever is still in flight.
                self.generation += 1;
                self.loading = false;
                self.error = None;
                None
            }
            Some(id) if self.active.as_ref() == Some(&id) => None,
            Some(id) => {
                self.active = Some(id);
                self.start()
            }
        }
    }

    /// Clear selection, state and counters. The generation keeps counting so
    /// tickets issued before the reset stay stale.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }

    /// Issue a fresh request for the active conversation, superseding any
    /// request still in flight.
    pub fn reload(&mut self) -> Option<FetchTicket> {
        self.active.as_ref()?;
        self.start()
    }

    fn start(&mut self) -> Option<FetchTicket> {
        let conversation = self.active.clone()?;
        self.generation += 1;
        self.loading = true;
        self.error = None;

        debug!(
            conversation = %conversation,
            generation = self.generation,
            "Issuing snapshot request"
        );

        Some(FetchTicket {
            conversation,
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.generation == ticket.generation && self.active.as_ref() == Some(&ticket.conversation)
    }

    /// Apply a completed request.
    ///
    /// A current success replaces the conversation's log. A current failure
    /// records the error and commits an empty log. Stale results touch
    /// nothing.
    pub fn complete<E: Display>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Message>, E>,
        cache: &mut MessageCache,
    ) -> FetchOutcome {
        if !self.is_current(ticket) {
            self.stats.stale += 1;
            debug!(
                conversation = %ticket.conversation,
                generation = ticket.generation,
                current = self.generation,
                "Discarding stale snapshot"
            );
            return FetchOutcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(messages) => {
                let count = messages.len();
                cache.set_messages(&ticket.conversation, messages);
                self.error = None;
                self.stats.committed += 1;
                info!(conversation = %ticket.conversation, count, "Snapshot committed");
                FetchOutcome::Committed { count }
            }
            Err(e) => {
                warn!(conversation = %ticket.conversation, error = %e, "Snapshot request failed");
                cache.set_messages(&ticket.conversation, Vec::new());
                self.error = Some(e.to_string());
                self.stats.failed += 1;
                FetchOutcome::Failed
            }
        }
    }

    pub fn active(&self) -> Option<&ChannelId> {
        self.active.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// Loading/error state joined with the cached messages.
    pub fn view(&self, cache: &MessageCache) -> ConversationView {
        ConversationView {
            conversation: self.active.clone(),
            loading: self.loading,
            error: self.error.clone(),
            messages: self
                .active
                .as_ref()
                .map(|id| cache.get_messages(id).to_vec())
                .unwrap_or_default(),
        }
    }
}
