use std::future::Future;

use futures::stream::BoxStream;
use serde_json::Value;

use messagify_shared::{Channel, ChannelId, GroupId, Message};

use crate::error::NetError;

/// Pull-based snapshot queries.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Current messages of a conversation, newest first.
    fn fetch_conversation_snapshot(
        &self,
        conversation: ChannelId,
    ) -> impl Future<Output = Result<Vec<Message>, NetError>> + Send;

    /// Top-level conversation list (direct messages).
    fn fetch_conversation_list(
        &self,
    ) -> impl Future<Output = Result<Vec<Channel>, NetError>> + Send;

    /// Channel list of a group, categories included.
    fn fetch_conversation_list_for_group(
        &self,
        group: GroupId,
    ) -> impl Future<Output = Result<Vec<Channel>, NetError>> + Send;
}

/// Push stream of raw change notifications.
///
/// Each call returns an independent subscription; dropping the stream
/// unsubscribes.
pub trait EventSource: Send + Sync + 'static {
    fn subscribe(&self) -> BoxStream<'static, Value>;
}
