//! The sync engine task and its handle.
//!
//! One tokio task owns the [`SyncContext`] and handles [`SyncCommand`]s one
//! at a time. Snapshot requests and the event stream run in their own tasks
//! and re-enter the engine as commands, so cache writes never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use messagify_net::{EventSource, NetError, SnapshotSource};
use messagify_shared::{ChangeNotification, Channel, ChannelId, GroupId, Message};

use crate::context::{SyncContext, SyncStats};
use crate::error::SyncError;
use crate::fetch::{ConversationView, FetchTicket};
use crate::listener::{ListenerId, ListenerRegistry};
use crate::tree::ChannelTree;
use crate::view_state::ViewState;

/// Commands sent *to* the engine task.
#[derive(Debug)]
pub(crate) enum SyncCommand {
    /// Fetch the DM list (`None`) or a group's channels and rebuild the tree.
    RefreshChannels(Option<GroupId>),
    ChannelsLoaded {
        generation: u64,
        result: Result<Vec<Channel>, NetError>,
    },
    Select(Option<ChannelId>),
    Reload,
    ToggleCategory {
        category: ChannelId,
        reply: oneshot::Sender<bool>,
    },
    SnapshotCompleted {
        ticket: FetchTicket,
        result: Result<Vec<Message>, NetError>,
    },
    AttachEvents(oneshot::Sender<bool>),
    DetachEvents(oneshot::Sender<bool>),
    Deliver {
        listener: ListenerId,
        notification: ChangeNotification,
    },
    ListenerEnded(ListenerId),
    GetMessages(ChannelId, oneshot::Sender<Vec<Message>>),
    GetTree(oneshot::Sender<ChannelTree>),
    GetViewState(oneshot::Sender<ViewState>),
    GetConversationView(oneshot::Sender<ConversationView>),
    GetStats(oneshot::Sender<SyncStats>),
    Reset,
    Shutdown,
}

/// Configuration for spawning the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the command channel.
    pub command_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_buffer: 256,
        }
    }
}

/// Spawn the engine in a background tokio task.
///
/// The engine stops on [`SyncHandle::shutdown`] or once every handle has
/// been dropped and no request is in flight.
pub fn spawn_sync_engine<S, E>(snapshots: Arc<S>, events: Arc<E>, config: EngineConfig) -> SyncHandle
where
    S: SnapshotSource,
    E: EventSource,
{
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<SyncCommand>(config.command_buffer);

    let mut engine = SyncEngine {
        ctx: SyncContext::new(),
        listeners: ListenerRegistry::new(),
        snapshots,
        events,
        cmd_tx: cmd_tx.downgrade(),
        late_deliveries: 0,
    };

    tokio::spawn(async move {
        info!("Sync engine started");

        while let Some(cmd) = cmd_rx.recv().await {
            if !engine.handle(cmd) {
                break;
            }
        }

        engine.listeners.deregister();
        info!("Sync engine stopped");
    });

    SyncHandle { cmd_tx }
}

struct SyncEngine<S, E> {
    ctx: SyncContext,
    listeners: ListenerRegistry,
    snapshots: Arc<S>,
    events: Arc<E>,
    cmd_tx: mpsc::WeakSender<SyncCommand>,
    late_deliveries: u64,
}

impl<S, E> SyncEngine<S, E>
where
    S: SnapshotSource,
    E: EventSource,
{
    /// Handle one command. Returns `false` to stop the engine.
    fn handle(&mut self, cmd: SyncCommand) -> bool {
        match cmd {
            SyncCommand::RefreshChannels(group) => {
                let generation = self.ctx.begin_channel_refresh();
                self.spawn_channel_list(generation, group);
            }
            SyncCommand::ChannelsLoaded { generation, result } => {
                self.ctx.complete_channel_refresh(generation, result);
            }
            SyncCommand::Select(target) => {
                if let Some(ticket) = self.ctx.select(target) {
                    self.spawn_snapshot(ticket);
                }
            }
            SyncCommand::Reload => {
                if let Some(ticket) = self.ctx.reload() {
                    self.spawn_snapshot(ticket);
                }
            }
            SyncCommand::ToggleCategory { category, reply } => {
                let _ = reply.send(self.ctx.toggle_category(&category));
            }
            SyncCommand::SnapshotCompleted { ticket, result } => {
                self.ctx.complete_fetch(&ticket, result);
            }
            SyncCommand::AttachEvents(reply) => {
                let attached = self.attach_events();
                let _ = reply.send(attached);
            }
            SyncCommand::DetachEvents(reply) => {
                let _ = reply.send(self.listeners.deregister());
            }
            SyncCommand::Deliver {
                listener,
                notification,
            } => {
                if self.listeners.is_active(listener) {
                    self.ctx.apply_notification(notification);
                } else {
                    self.late_deliveries += 1;
                    debug!(
                        listener = %listener,
                        conversation = ?notification.conversation(),
                        "Dropping delivery from detached listener"
                    );
                }
            }
            SyncCommand::ListenerEnded(listener) => {
                self.listeners.clear_ended(listener);
            }
            SyncCommand::GetMessages(conversation, reply) => {
                let _ = reply.send(self.ctx.messages(&conversation).to_vec());
            }
            SyncCommand::GetTree(reply) => {
                let _ = reply.send(self.ctx.tree().clone());
            }
            SyncCommand::GetViewState(reply) => {
                let _ = reply.send(self.ctx.view_state());
            }
            SyncCommand::GetConversationView(reply) => {
                let _ = reply.send(self.ctx.conversation_view());
            }
            SyncCommand::GetStats(reply) => {
                let mut stats = self.ctx.stats();
                stats.late_deliveries = self.late_deliveries;
                let _ = reply.send(stats);
            }
            SyncCommand::Reset => {
                self.ctx.reset();
                self.late_deliveries = 0;
            }
            SyncCommand::Shutdown => {
                info!("Sync engine shutdown requested");
                return false;
            }
        }
        true
    }

    fn spawn_snapshot(&self, ticket: FetchTicket) {
        let Some(tx) = self.cmd_tx.upgrade() else {
            return;
        };
        let source = self.snapshots.clone();

        tokio::spawn(async move {
            let result = source
                .fetch_conversation_snapshot(ticket.conversation.clone())
                .await;
            let _ = tx.send(SyncCommand::SnapshotCompleted { ticket, result }).await;
        });
    }

    fn spawn_channel_list(&self, generation: u64, group: Option<GroupId>) {
        let Some(tx) = self.cmd_tx.upgrade() else {
            return;
        };
        let source = self.snapshots.clone();

        tokio::spawn(async move {
            let result = match group {
                Some(group) => source.fetch_conversation_list_for_group(group).await,
                None => source.fetch_conversation_list().await,
            };
            let _ = tx.send(SyncCommand::ChannelsLoaded { generation, result }).await;
        });
    }

    fn attach_events(&mut self) -> bool {
        let events = self.events.clone();
        let tx = self.cmd_tx.clone();
        self.listeners
            .register(|id, active| spawn_forwarder(events.as_ref(), tx, id, active))
            .is_some()
    }
}

/// Subscribe now and forward decoded notifications until the stream ends,
/// the listener is deactivated or the engine goes away.
fn spawn_forwarder<E: EventSource>(
    events: &E,
    tx: mpsc::WeakSender<SyncCommand>,
    listener: ListenerId,
    active: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let mut stream = events.subscribe();

    tokio::spawn(async move {
        while let Some(payload) = stream.next().await {
            if !active.load(Ordering::Acquire) {
                break;
            }
            let notification = ChangeNotification::decode(&payload);
            let Some(sender) = tx.upgrade() else {
                break;
            };
            if sender
                .send(SyncCommand::Deliver {
                    listener,
                    notification,
                })
                .await
                .is_err()
            {
                break;
            }
        }

        if active.load(Ordering::Acquire) {
            warn!(listener = %listener, "Event stream closed");
            if let Some(sender) = tx.upgrade() {
                let _ = sender.send(SyncCommand::ListenerEnded(listener)).await;
            }
        }
    })
}

/// Cloneable handle to the engine task.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    pub(crate) cmd_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    async fn send(&self, cmd: SyncCommand) -> Result<(), SyncError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SyncError::EngineStopped)
    }

    async fn request<T>(
        &self,
        cmd: impl FnOnce(oneshot::Sender<T>) -> SyncCommand,
    ) -> Result<T, SyncError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(cmd(reply_tx)).await?;
        reply_rx.await.map_err(|_| SyncError::EngineStopped)
    }

    /// Refresh the channel list: DMs for `None`, else the group's channels.
    pub async fn refresh_channels(&self, group: Option<GroupId>) -> Result<(), SyncError> {
        self.send(SyncCommand::RefreshChannels(group)).await
    }

    /// Change the active conversation. The snapshot loads in the background;
    /// watch [`conversation_view`](Self::conversation_view) for the result.
    pub async fn select(&self, conversation: Option<ChannelId>) -> Result<(), SyncError> {
        self.send(SyncCommand::Select(conversation)).await
    }

    /// Re-fetch the active conversation.
    pub async fn reload(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Reload).await
    }

    /// Flip a category; returns whether it is now expanded.
    pub async fn toggle_category(&self, category: ChannelId) -> Result<bool, SyncError> {
        self.request(|reply| SyncCommand::ToggleCategory { category, reply })
            .await
    }

    /// Start forwarding the event stream. Returns `false` if already attached.
    pub async fn attach_events(&self) -> Result<bool, SyncError> {
        self.request(SyncCommand::AttachEvents).await
    }

    /// Stop forwarding. Returns `false` if nothing was attached.
    pub async fn detach_events(&self) -> Result<bool, SyncError> {
        self.request(SyncCommand::DetachEvents).await
    }

    pub async fn messages(&self, conversation: ChannelId) -> Result<Vec<Message>, SyncError> {
        self.request(|reply| SyncCommand::GetMessages(conversation, reply))
            .await
    }

    pub async fn tree(&self) -> Result<ChannelTree, SyncError> {
        self.request(SyncCommand::GetTree).await
    }

    pub async fn view_state(&self) -> Result<ViewState, SyncError> {
        self.request(SyncCommand::GetViewState).await
    }

    pub async fn conversation_view(&self) -> Result<ConversationView, SyncError> {
        self.request(SyncCommand::GetConversationView).await
    }

    pub async fn stats(&self) -> Result<SyncStats, SyncError> {
        self.request(SyncCommand::GetStats).await
    }

    pub async fn reset(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Reset).await
    }

    pub async fn shutdown(&self) -> Result<(), SyncError> {
        self.send(SyncCommand::Shutdown).await
    }
}
