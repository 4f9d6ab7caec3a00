//! # messagify
//!
//! Terminal client for the sync core.
//!
//! Lists the DM or group channel tree, optionally opens one conversation and,
//! in follow mode, applies newline-delimited JSON notifications read from
//! stdin to the open conversation.

mod config;
mod render;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use messagify_net::{BroadcastEventSource, HttpSnapshotSource};
use messagify_shared::constants::APP_NAME;
use messagify_shared::ChannelId;
use messagify_sync::{
    spawn_sync_engine, ConversationView, EngineConfig, SyncHandle, SyncStats,
};

use crate::config::CliConfig;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,messagify_sync=debug,messagify_net=debug")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration and validate the token
    // -----------------------------------------------------------------------
    let config = CliConfig::from_env();
    info!(?config, "Loaded configuration");

    let token = config
        .token
        .clone()
        .context("MESSAGIFY_TOKEN is not set")?;

    let source = HttpSnapshotSource::new(config.api_base.clone(), token)
        .with_message_limit(config.message_limit);
    let me = source
        .check_token()
        .await
        .context("token validation failed")?;
    info!(user = %me.display_name(), "Authenticated");

    // Without a group, show which groups could be listed instead of DMs.
    if config.group_id.is_none() {
        match source.fetch_groups().await {
            Ok(groups) => print!("{}", render::render_groups(&groups)),
            Err(e) => warn!(error = %e, "Could not list groups"),
        }
    }

    // -----------------------------------------------------------------------
    // 3. Spawn the sync engine and attach the event stream
    // -----------------------------------------------------------------------
    let events = Arc::new(BroadcastEventSource::default());
    let handle = spawn_sync_engine(Arc::new(source), events.clone(), EngineConfig::default());
    handle.attach_events().await?;

    // -----------------------------------------------------------------------
    // 4. Channel tree
    // -----------------------------------------------------------------------
    handle.refresh_channels(config.group_id.clone()).await?;
    let stats = wait_for_stats(&handle, |s| {
        s.channel_lists_applied + s.channel_lists_failed > 0
    })
    .await?;
    if stats.channel_lists_failed > 0 {
        warn!("Channel list could not be loaded");
    }

    let tree = handle.tree().await?;
    let view = handle.view_state().await?;
    print!("{}", render::render_tree(&tree, &view));

    // -----------------------------------------------------------------------
    // 5. Open the requested conversation
    // -----------------------------------------------------------------------
    if let Some(conversation) = config.conversation_id.clone() {
        handle.select(Some(conversation.clone())).await?;
        let view = wait_for_load(&handle).await?;
        print_conversation(&conversation, &view);
    }

    // -----------------------------------------------------------------------
    // 6. Follow stdin until EOF or Ctrl+C
    // -----------------------------------------------------------------------
    if config.follow {
        let stdin = BufReader::new(tokio::io::stdin());
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        follow(&handle, &events, config.conversation_id.as_ref(), stdin, ctrl_c).await?;
    }

    handle.shutdown().await?;
    Ok(())
}

fn print_conversation(conversation: &ChannelId, view: &ConversationView) {
    println!("--- {conversation} ---");
    if let Some(error) = &view.error {
        println!("error: {error}");
    }
    print!("{}", render::render_messages(&view.messages));
}

async fn wait_for_stats(
    handle: &SyncHandle,
    done: impl Fn(&SyncStats) -> bool,
) -> anyhow::Result<SyncStats> {
    let poll = async {
        loop {
            let stats = handle.stats().await?;
            if done(&stats) {
                return Ok::<_, anyhow::Error>(stats);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(LOAD_TIMEOUT, poll)
        .await
        .context("timed out waiting for the sync engine")?
}

async fn wait_for_load(handle: &SyncHandle) -> anyhow::Result<ConversationView> {
    let poll = async {
        loop {
            let view = handle.conversation_view().await?;
            if !view.loading {
                return Ok::<_, anyhow::Error>(view);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(LOAD_TIMEOUT, poll)
        .await
        .context("timed out loading conversation")?
}

fn events_seen(stats: &SyncStats) -> u64 {
    stats.events_applied + stats.events_ignored + stats.lifecycle_signals + stats.malformed_events
}

/// Publish each input line as a raw notification and reprint the open
/// conversation once the engine has processed it. Stops at end of input or
/// when `shutdown` resolves, including while waiting on the engine.
async fn follow<R, F>(
    handle: &SyncHandle,
    events: &BroadcastEventSource,
    conversation: Option<&ChannelId>,
    input: R,
    shutdown: F,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    info!("Following input, one JSON notification per line");

    tokio::select! {
        result = feed_lines(handle, events, conversation, input) => result,
        _ = shutdown => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

async fn feed_lines<R: AsyncBufRead + Unpin>(
    handle: &SyncHandle,
    events: &BroadcastEventSource,
    conversation: Option<&ChannelId>,
    input: R,
) -> anyhow::Result<()> {
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let payload: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Skipping line that is not JSON");
                continue;
            }
        };

        let before = events_seen(&handle.stats().await?);
        events.publish(payload);
        wait_for_stats(handle, |s| events_seen(s) > before).await?;

        if let Some(conversation) = conversation {
            let view = handle.conversation_view().await?;
            print_conversation(conversation, &view);
        }
    }

    info!("Input closed");
    Ok(())
}
