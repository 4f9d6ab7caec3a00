//! Applies push notifications to the message cache.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use messagify_shared::{ChangeNotification, LifecycleSignal, StreamStatus};
use messagify_store::MessageCache;

/// Result of applying one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The cache changed.
    Applied,
    /// A valid message event that changed nothing (duplicate create,
    /// unknown target).
    Ignored,
    Lifecycle,
    /// Malformed payload.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilerStats {
    pub applied: u64,
    pub ignored: u64,
    pub lifecycle: u64,
    pub malformed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct EventReconciler {
    status: StreamStatus,
    stats: ReconcilerStats,
}

impl EventReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        cache: &mut MessageCache,
        notification: ChangeNotification,
    ) -> ReconcileOutcome {
        let changed = match notification {
            ChangeNotification::Created {
                conversation,
                message,
            } => {
                debug!(conversation = %conversation, message = %message.id, "Message created");
                cache.add_message(&conversation, message)
            }

            ChangeNotification::Updated {
                conversation,
                message_id,
                patch,
            } => {
                debug!(conversation = %conversation, message = %message_id, "Message updated");
                cache.update_message(&conversation, &message_id, &patch)
            }

            ChangeNotification::Deleted {
                conversation,
                message_id,
            } => {
                debug!(conversation = %conversation, message = %message_id, "Message deleted");
                cache.delete_message(&conversation, &message_id)
            }

            ChangeNotification::Lifecycle(signal) => {
                self.on_lifecycle(signal);
                self.stats.lifecycle += 1;
                return ReconcileOutcome::Lifecycle;
            }

            ChangeNotification::Malformed { kind, reason } => {
                warn!(kind = %kind, reason = %reason, "Dropping malformed notification");
                self.stats.malformed += 1;
                return ReconcileOutcome::Dropped;
            }
        };

        if changed {
            self.stats.applied += 1;
            ReconcileOutcome::Applied
        } else {
            self.stats.ignored += 1;
            ReconcileOutcome::Ignored
        }
    }

    fn on_lifecycle(&mut self, signal: LifecycleSignal) {
        match signal {
            LifecycleSignal::Connected => {
                info!("Event stream connected");
                self.status = StreamStatus::Connected;
            }
            LifecycleSignal::Ready => {
                info!("Event stream ready");
                self.status = StreamStatus::Ready;
            }
            LifecycleSignal::Disconnected => {
                info!("Event stream disconnected");
                self.status = StreamStatus::Disconnected;
            }
            LifecycleSignal::Error(message) => {
                error!(error = %message, "Event stream reported an error");
            }
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use messagify_shared::{Author, ChannelId, Message, MessageId, MessagePatch};
    use serde_json::json;

    fn msg(id: &str, content: &str) -> Message {
        Message {
            id: MessageId::from(id),
            content: content.to_string(),
            timestamp: Utc::now(),
            edited_timestamp: None,
            author: Author {
                id: "u1".into(),
                username: "alice".into(),
                global_name: None,
                avatar: None,
            },
        }
    }

    fn created(conversation: &str, id: &str) -> ChangeNotification {
        ChangeNotification::Created {
            conversation: ChannelId::from(conversation),
            message: msg(id, "hi"),
        }
    }

    #[test]
    fn test_create_then_duplicate() {
        let mut reconciler = EventReconciler::new();
        let mut cache = MessageCache::new();

        assert_eq!(reconciler.apply(&mut cache, created("c", "1")), ReconcileOutcome::Applied);
        assert_eq!(reconciler.apply(&mut cache, created("c", "1")), ReconcileOutcome::Ignored);

        assert_eq!(cache.get_messages(&ChannelId::from("c")).len(), 1);
        assert_eq!(reconciler.stats().applied, 1);
        assert_eq!(reconciler.stats().ignored, 1);
    }

    #[test]
    fn test_update_merges_present_fields() {
        let mut reconciler = EventReconciler::new();
        let mut cache = MessageCache::new();
        let c = ChannelId::from("c");
        reconciler.apply(&mut cache, created("c", "1"));

        let outcome = reconciler.apply(
            &mut cache,
            ChangeNotification::Updated {
                conversation: c.clone(),
                message_id: MessageId::from("1"),
                patch: MessagePatch {
                    content: Some("edited".into()),
                    edited_timestamp: None,
                },
            },
        );

        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(cache.get_messages(&c)[0].content, "edited");
    }

    #[test]
    fn test_update_and_delete_of_unknown_message_ignored() {
        let mut reconciler = EventReconciler::new();
        let mut cache = MessageCache::new();

        let update = ChangeNotification::Updated {
            conversation: ChannelId::from("c"),
            message_id: MessageId::from("missing"),
            patch: MessagePatch::default(),
        };
        let delete = ChangeNotification::Deleted {
            conversation: ChannelId::from("c"),
            message_id: MessageId::from("missing"),
        };

        assert_eq!(reconciler.apply(&mut cache, update), ReconcileOutcome::Ignored);
        assert_eq!(reconciler.apply(&mut cache, delete), ReconcileOutcome::Ignored);
        assert_eq!(cache.conversation_count(), 0);
    }

    #[test]
    fn test_delete_removes_message() {
        let mut reconciler = EventReconciler::new();
        let mut cache = MessageCache::new();
        reconciler.apply(&mut cache, created("c", "1"));
        reconciler.apply(&mut cache, created("c", "2"));

        let outcome = reconciler.apply(
            &mut cache,
            ChangeNotification::Deleted {
                conversation: ChannelId::from("c"),
                message_id: MessageId::from("1"),
            },
        );

        assert_eq!(outcome, ReconcileOutcome::Applied);
        let ids: Vec<_> = cache
            .get_messages(&ChannelId::from("c"))
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn test_lifecycle_tracks_status_without_touching_cache() {
        let mut reconciler = EventReconciler::new();
        let mut cache = MessageCache::new();
        assert_eq!(reconciler.status(), StreamStatus::Disconnected);

        let signals = [
            (LifecycleSignal::Connected, StreamStatus::Connected),
            (LifecycleSignal::Ready, StreamStatus::Ready),
            (LifecycleSignal::Error("boom".into()), StreamStatus::Ready),
            (LifecycleSignal::Disconnected, StreamStatus::Disconnected),
        ];
        for (signal, expected) in signals {
            let outcome = reconciler.apply(&mut cache, ChangeNotification::Lifecycle(signal));
            assert_eq!(outcome, ReconcileOutcome::Lifecycle);
            assert_eq!(reconciler.status(), expected);
        }

        assert_eq!(cache.conversation_count(), 0);
        assert_eq!(reconciler.stats().lifecycle, 4);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let mut reconciler = EventReconciler::new();
        let mut cache = MessageCache::new();

        let missing_channel = ChangeNotification::decode(&json!({
            "type": "MessageCreate",
            "data": {"id": "1", "content": "x"}
        }));
        let unknown = ChangeNotification::decode(&json!({"type": "TypingStart", "data": {}}));

        assert_eq!(reconciler.apply(&mut cache, missing_channel), ReconcileOutcome::Dropped);
        assert_eq!(reconciler.apply(&mut cache, unknown), ReconcileOutcome::Dropped);
        assert_eq!(cache.conversation_count(), 0);
        assert_eq!(reconciler.stats().malformed, 2);
    }
}
