//! The sync state of one session.
//!
//! [`SyncContext`] bundles the cache, the navigation tree and its view state,
//! the snapshot coordinator and the event reconciler. All methods are
//! synchronous; the engine task owns one context and is its only writer.

use std::fmt::Display;

use serde::Serialize;
use tracing::{debug, info, warn};

use messagify_shared::{ChangeNotification, Channel, ChannelId, Message, StreamStatus};
use messagify_store::MessageCache;

use crate::fetch::{ConversationView, FetchOutcome, FetchTicket, SnapshotFetchCoordinator};
use crate::reconciler::{EventReconciler, ReconcileOutcome};
use crate::tree::{self, ChannelTree};
use crate::view_state::{ViewState, ViewStateController};

/// Counters and status for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub events_applied: u64,
    pub events_ignored: u64,
    pub lifecycle_signals: u64,
    pub malformed_events: u64,
    pub snapshots_committed: u64,
    pub snapshots_failed: u64,
    pub stale_snapshots: u64,
    pub channel_lists_applied: u64,
    pub channel_lists_failed: u64,
    pub stale_channel_lists: u64,
    /// Deliveries that arrived from a listener after it was detached.
    /// Filled in by the engine.
    pub late_deliveries: u64,
    pub cached_conversations: usize,
    pub stream_status: StreamStatus,
}

#[derive(Debug, Default)]
pub struct SyncContext {
    cache: MessageCache,
    view: ViewStateController,
    fetch: SnapshotFetchCoordinator,
    reconciler: EventReconciler,
    tree: ChannelTree,
    list_generation: u64,
    lists_applied: u64,
    lists_failed: u64,
    stale_channel_lists: u64,
}

impl SyncContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state, as on logout. Generation counters carry over, so
    /// requests still in flight from before the reset resolve as stale.
    pub fn reset(&mut self) {
        info!(
            conversations = self.cache.conversation_count(),
            "Resetting sync context"
        );
        let mut fetch = std::mem::take(&mut self.fetch);
        fetch.reset();
        *self = Self {
            fetch,
            list_generation: self.list_generation + 1,
            ..Self::default()
        };
    }

    // ------------------------------------------------------------------
    // Channel list
    // ------------------------------------------------------------------

    /// Rebuild the tree from a list snapshot and reconcile category state.
    /// Returns whether the tracked categories changed.
    pub fn apply_channel_snapshot(&mut self, items: &[Channel]) -> bool {
        self.tree = tree::build(items);
        debug!(
            leaves = self.tree.leaf_count(),
            categories = self.tree.categories.len(),
            "Rebuilt channel tree"
        );
        self.view.reconcile(&self.tree.category_ids)
    }

    /// Start a list request; the returned generation must be handed back to
    /// [`complete_channel_refresh`](Self::complete_channel_refresh).
    pub fn begin_channel_refresh(&mut self) -> u64 {
        self.list_generation += 1;
        self.list_generation
    }

    /// Apply a finished list request. Stale generations are discarded. A
    /// failure keeps the current tree.
    pub fn complete_channel_refresh<E: Display>(
        &mut self,
        generation: u64,
        result: Result<Vec<Channel>, E>,
    ) -> bool {
        if generation != self.list_generation {
            self.stale_channel_lists += 1;
            debug!(
                generation,
                current = self.list_generation,
                "Discarding stale channel list"
            );
            return false;
        }

        match result {
            Ok(items) => {
                self.apply_channel_snapshot(&items);
                self.lists_applied += 1;
                true
            }
            Err(e) => {
                warn!(error = %e, "Channel list request failed, keeping current tree");
                self.lists_failed += 1;
                false
            }
        }
    }

    pub fn toggle_category(&mut self, id: &ChannelId) -> bool {
        self.view.toggle_category(id)
    }

    // ------------------------------------------------------------------
    // Active conversation
    // ------------------------------------------------------------------

    /// Record the selection and return the snapshot request to issue, if any.
    pub fn select(&mut self, conversation: Option<ChannelId>) -> Option<FetchTicket> {
        self.view.select(conversation.clone());
        self.fetch.select_conversation(conversation)
    }

    pub fn reload(&mut self) -> Option<FetchTicket> {
        self.fetch.reload()
    }

    pub fn complete_fetch<E: Display>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Message>, E>,
    ) -> FetchOutcome {
        self.fetch.complete(ticket, result, &mut self.cache)
    }

    pub fn apply_notification(&mut self, notification: ChangeNotification) -> ReconcileOutcome {
        self.reconciler.apply(&mut self.cache, notification)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn messages(&self, conversation: &ChannelId) -> &[Message] {
        self.cache.get_messages(conversation)
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    pub fn tree(&self) -> &ChannelTree {
        &self.tree
    }

    pub fn view_state(&self) -> ViewState {
        self.view.snapshot()
    }

    pub fn is_expanded(&self, category: &ChannelId) -> bool {
        self.view.is_expanded(category)
    }

    pub fn conversation_view(&self) -> ConversationView {
        self.fetch.view(&self.cache)
    }

    pub fn stats(&self) -> SyncStats {
        let events = self.reconciler.stats();
        let fetch = self.fetch.stats();
        SyncStats {
            events_applied: events.applied,
            events_ignored: events.ignored,
            lifecycle_signals: events.lifecycle,
            malformed_events: events.malformed,
            snapshots_committed: fetch.committed,
            snapshots_failed: fetch.failed,
            stale_snapshots: fetch.stale,
            channel_lists_applied: self.lists_applied,
            channel_lists_failed: self.lists_failed,
            stale_channel_lists: self.stale_channel_lists,
            late_deliveries: 0,
            cached_conversations: self.cache.conversation_count(),
            stream_status: self.reconciler.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use messagify_shared::{Author, ChannelKind, MessageId};

    fn msg(id: &str) -> Message {
        Message {
            id: MessageId::from(id),
            content: format!("message {id}"),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            edited_timestamp: None,
            author: Author {
                id: "u1".into(),
                username: "alice".into(),
                global_name: None,
                avatar: None,
            },
        }
    }

    fn channel(id: &str, kind: ChannelKind, position: i64, parent: Option<&str>) -> Channel {
        Channel {
            id: ChannelId::from(id),
            name: id.to_string(),
            kind,
            position,
            parent_id: parent.map(ChannelId::from),
        }
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_late_snapshot_for_previous_conversation_discarded() {
        let mut ctx = SyncContext::new();
        let a = ChannelId::from("A");
        let b = ChannelId::from("B");

        let ticket_a = ctx.select(Some(a.clone())).unwrap();
        let ticket_b = ctx.select(Some(b.clone())).unwrap();

        assert_eq!(
            ctx.complete_fetch(&ticket_b, Ok::<_, String>(vec![msg("b1")])),
            FetchOutcome::Committed { count: 1 }
        );
        assert_eq!(
            ctx.complete_fetch(&ticket_a, Ok::<_, String>(vec![msg("a1")])),
            FetchOutcome::Stale
        );

        assert!(ctx.messages(&a).is_empty());
        assert_eq!(ids(ctx.messages(&b)), vec!["b1"]);
        assert_eq!(ctx.stats().stale_snapshots, 1);
    }

    #[test]
    fn test_events_before_and_after_snapshot() {
        let mut ctx = SyncContext::new();
        let c = ChannelId::from("C");
        let ticket = ctx.select(Some(c.clone())).unwrap();

        // Arrives while the snapshot is in flight and is overwritten by it.
        ctx.apply_notification(ChangeNotification::Created {
            conversation: c.clone(),
            message: msg("early"),
        });
        ctx.complete_fetch(&ticket, Ok::<_, String>(vec![msg("2"), msg("1")]));
        assert_eq!(ids(ctx.messages(&c)), vec!["2", "1"]);

        ctx.apply_notification(ChangeNotification::Created {
            conversation: c.clone(),
            message: msg("3"),
        });
        assert_eq!(ids(ctx.messages(&c)), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_conversation_view_reports_failure() {
        let mut ctx = SyncContext::new();
        let c = ChannelId::from("C");
        let ticket = ctx.select(Some(c.clone())).unwrap();
        assert!(ctx.conversation_view().loading);

        ctx.complete_fetch(&ticket, Err::<Vec<Message>, _>("HTTP 403"));
        let view = ctx.conversation_view();

        assert_eq!(view.conversation, Some(c));
        assert!(!view.loading);
        assert_eq!(view.error.as_deref(), Some("HTTP 403"));
        assert!(view.messages.is_empty());
        assert_eq!(ctx.stats().snapshots_failed, 1);
    }

    #[test]
    fn test_selection_mirrored_in_view_state() {
        let mut ctx = SyncContext::new();
        ctx.select(Some(ChannelId::from("C")));
        assert_eq!(ctx.view_state().selected, Some(ChannelId::from("C")));

        assert!(ctx.select(None).is_none());
        assert_eq!(ctx.view_state().selected, None);
        assert_eq!(ctx.conversation_view(), ConversationView::default());
    }

    #[test]
    fn test_channel_snapshot_preserves_collapsed_category() {
        let mut ctx = SyncContext::new();
        let cat = ChannelId::from("cat");
        let first = vec![
            channel("cat", ChannelKind::GuildCategory, 0, None),
            channel("general", ChannelKind::GuildText, 0, Some("cat")),
        ];
        assert!(ctx.apply_channel_snapshot(&first));
        assert!(ctx.is_expanded(&cat));

        ctx.toggle_category(&cat);

        // The category empties out, then fills again.
        let emptied = vec![channel("cat", ChannelKind::GuildCategory, 0, None)];
        ctx.apply_channel_snapshot(&emptied);
        assert!(ctx.tree().categories.is_empty());

        ctx.apply_channel_snapshot(&first);
        assert!(!ctx.is_expanded(&cat));
        assert_eq!(ctx.tree().categories.len(), 1);
    }

    #[test]
    fn test_stale_channel_list_keeps_current_tree() {
        let mut ctx = SyncContext::new();
        let slow = ctx.begin_channel_refresh();
        let fast = ctx.begin_channel_refresh();

        let applied = ctx.complete_channel_refresh(
            fast,
            Ok::<_, String>(vec![channel("new", ChannelKind::GuildText, 0, None)]),
        );
        assert!(applied);

        let applied = ctx.complete_channel_refresh(
            slow,
            Ok::<_, String>(vec![channel("old", ChannelKind::GuildText, 0, None)]),
        );
        assert!(!applied);

        assert!(ctx.tree().find_leaf(&ChannelId::from("new")).is_some());
        assert_eq!(ctx.stats().stale_channel_lists, 1);
    }

    #[test]
    fn test_failed_channel_list_keeps_tree() {
        let mut ctx = SyncContext::new();
        ctx.apply_channel_snapshot(&[channel("dm", ChannelKind::Dm, 0, None)]);

        let generation = ctx.begin_channel_refresh();
        assert!(!ctx.complete_channel_refresh(generation, Err::<Vec<Channel>, _>("timeout")));
        assert_eq!(ctx.tree().leaf_count(), 1);
        assert_eq!(ctx.stats().channel_lists_failed, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = SyncContext::new();
        let c = ChannelId::from("C");
        let ticket = ctx.select(Some(c.clone())).unwrap();
        ctx.complete_fetch(&ticket, Ok::<_, String>(vec![msg("1")]));
        ctx.apply_channel_snapshot(&[channel("cat", ChannelKind::GuildCategory, 0, None)]);

        ctx.reset();

        assert!(ctx.messages(&c).is_empty());
        assert!(ctx.tree().is_empty());
        assert_eq!(ctx.view_state(), ViewState::default());
        assert_eq!(ctx.stats(), SyncStats::default());
    }

    #[test]
    fn test_snapshot_from_before_reset_is_stale() {
        let mut ctx = SyncContext::new();
        let c = ChannelId::from("C");
        let old = ctx.select(Some(c.clone())).unwrap();

        ctx.reset();
        let new = ctx.select(Some(c.clone())).unwrap();
        assert_ne!(old, new);

        assert_eq!(
            ctx.complete_fetch(&old, Ok::<_, String>(vec![msg("pre-reset")])),
            FetchOutcome::Stale
        );
        assert!(ctx.messages(&c).is_empty());
        assert!(ctx.conversation_view().loading);

        assert_eq!(
            ctx.complete_fetch(&new, Ok::<_, String>(vec![msg("fresh")])),
            FetchOutcome::Committed { count: 1 }
        );
        assert_eq!(ids(ctx.messages(&c)), vec!["fresh"]);
    }

    #[test]
    fn test_channel_list_from_before_reset_is_stale() {
        let mut ctx = SyncContext::new();
        let old = ctx.begin_channel_refresh();

        ctx.reset();
        let new = ctx.begin_channel_refresh();
        assert_ne!(old, new);

        assert!(ctx.complete_channel_refresh(
            new,
            Ok::<_, String>(vec![channel("new", ChannelKind::GuildText, 0, None)]),
        ));
        assert!(!ctx.complete_channel_refresh(
            old,
            Ok::<_, String>(vec![channel("old", ChannelKind::GuildText, 0, None)]),
        ));

        assert!(ctx.tree().find_leaf(&ChannelId::from("new")).is_some());
        assert!(ctx.tree().find_leaf(&ChannelId::from("old")).is_none());
    }
}
