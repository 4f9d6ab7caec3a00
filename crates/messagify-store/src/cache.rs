//! Per-conversation message cache.

use std::collections::HashMap;

use messagify_shared::{ChannelId, Message, MessageId, MessagePatch};
use tracing::debug;

use crate::log::MessageLog;

/// Owns every [`MessageLog`]. Nothing else mutates a log directly.
#[derive(Debug, Clone, Default)]
pub struct MessageCache {
    logs: HashMap<ChannelId, MessageLog>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Replace the whole log of a conversation with a snapshot.
    pub fn set_messages(&mut self, conversation: &ChannelId, messages: Vec<Message>) {
        let log = MessageLog::from_snapshot(conversation.clone(), messages);
        debug!(conversation = %conversation, count = log.len(), "Replaced message log");
        self.logs.insert(conversation.clone(), log);
    }

    /// Insert at the front of the log, creating the log for an unseen
    /// conversation. Returns `false` for a duplicate id.
    pub fn add_message(&mut self, conversation: &ChannelId, message: Message) -> bool {
        self.logs
            .entry(conversation.clone())
            .or_insert_with(|| MessageLog::new(conversation.clone()))
            .push_front(message)
    }

    /// Merge `patch` into an existing message. No-op when either the
    /// conversation or the message is unknown.
    pub fn update_message(
        &mut self,
        conversation: &ChannelId,
        message_id: &MessageId,
        patch: &MessagePatch,
    ) -> bool {
        self.logs
            .get_mut(conversation)
            .map(|log| log.update(message_id, patch))
            .unwrap_or(false)
    }

    /// Remove a message. No-op when absent.
    pub fn delete_message(&mut self, conversation: &ChannelId, message_id: &MessageId) -> bool {
        self.logs
            .get_mut(conversation)
            .map(|log| log.remove(message_id))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Messages of a conversation, newest first; empty if none are cached.
    pub fn get_messages(&self, conversation: &ChannelId) -> &[Message] {
        self.logs
            .get(conversation)
            .map(MessageLog::messages)
            .unwrap_or(&[])
    }

    pub fn log(&self, conversation: &ChannelId) -> Option<&MessageLog> {
        self.logs.get(conversation)
    }

    pub fn contains_conversation(&self, conversation: &ChannelId) -> bool {
        self.logs.contains_key(conversation)
    }

    pub fn conversation_count(&self) -> usize {
        self.logs.len()
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    pub fn clear_conversation(&mut self, conversation: &ChannelId) {
        if self.logs.remove(conversation).is_some() {
            debug!(conversation = %conversation, "Cleared message log");
        }
    }

    pub fn clear_all(&mut self) {
        debug!(conversations = self.logs.len(), "Clearing message cache");
        self.logs.clear();
    }
}
