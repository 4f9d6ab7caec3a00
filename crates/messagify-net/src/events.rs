use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::source::EventSource;

/// Default number of undelivered notifications kept per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// [`EventSource`] fed by [`publish`](Self::publish).
///
/// A gateway connection (or any other producer) pushes raw
/// `{"type": ..., "data": ...}` payloads in; every live subscription receives
/// them in publish order.
#[derive(Debug, Clone)]
pub struct BroadcastEventSource {
    tx: broadcast::Sender<Value>,
}

impl BroadcastEventSource {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver a payload to all current subscribers. Returns how many
    /// subscribers it reached; zero is not an error.
    pub fn publish(&self, payload: Value) -> usize {
        match self.tx.send(payload) {
            Ok(n) => n,
            Err(_) => {
                debug!("Published notification with no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventSource {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSource for BroadcastEventSource {
    fn subscribe(&self) -> BoxStream<'static, Value> {
        let rx = self.tx.subscribe();
        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(payload) => return Some((payload, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event subscriber lagged, notifications lost");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
