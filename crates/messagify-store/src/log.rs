use std::collections::HashSet;

use messagify_shared::{ChannelId, Message, MessageId, MessagePatch};

/// Ordered, deduplicated messages of one conversation, newest first.
///
/// The order is the remote delivery order: snapshots arrive newest first and
/// live messages are pushed to the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLog {
    conversation: ChannelId,
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
}

impl MessageLog {
    pub fn new(conversation: ChannelId) -> Self {
        Self {
            conversation,
            messages: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Build a log from a snapshot. A repeated id keeps its first occurrence.
    pub fn from_snapshot(conversation: ChannelId, snapshot: Vec<Message>) -> Self {
        let mut ids = HashSet::with_capacity(snapshot.len());
        let messages = snapshot
            .into_iter()
            .filter(|m| ids.insert(m.id.clone()))
            .collect();
        Self {
            conversation,
            messages,
            ids,
        }
    }

    pub fn conversation(&self) -> &ChannelId {
        &self.conversation
    }

    /// Messages, newest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        if !self.contains(id) {
            return None;
        }
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Insert at the front unless the id is already present.
    pub fn push_front(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            return false;
        }
        self.messages.insert(0, message);
        true
    }

    pub fn update(&mut self, id: &MessageId, patch: &MessagePatch) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.messages
            .iter_mut()
            .find(|m| &m.id == id)
            .map(|m| m.apply_patch(patch))
            .unwrap_or(false)
    }

    pub fn remove(&mut self, id: &MessageId) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.messages.retain(|m| &m.id != id);
        true
    }

    /// Messages in reading order (oldest first).
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev()
    }
}
