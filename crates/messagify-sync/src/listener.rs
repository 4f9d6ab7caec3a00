//! Registration of the event-stream forwarder.
//!
//! At most one listener is attached at a time. Each carries an activity flag
//! shared with its forwarding task; the engine checks it before applying a
//! delivery, so anything still queued after [`ListenerRegistry::deregister`]
//! never reaches the cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug)]
struct ActiveListener {
    id: ListenerId,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    current: Option<ActiveListener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.current.is_some()
    }

    /// Attach a listener unless one is already attached.
    ///
    /// `spawn` receives the new id and the activity flag and returns the
    /// forwarding task. It is not called when a listener is already attached.
    pub fn register<F>(&mut self, spawn: F) -> Option<ListenerId>
    where
        F: FnOnce(ListenerId, Arc<AtomicBool>) -> JoinHandle<()>,
    {
        if let Some(current) = &self.current {
            debug!(listener = %current.id, "Listener already attached");
            return None;
        }

        self.next_id += 1;
        let id = ListenerId(self.next_id);
        let active = Arc::new(AtomicBool::new(true));
        let task = spawn(id, active.clone());

        info!(listener = %id, "Event listener attached");
        self.current = Some(ActiveListener { id, active, task });
        Some(id)
    }

    /// Whether deliveries from `id` may still be applied.
    pub fn is_active(&self, id: ListenerId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|l| l.id == id && l.active.load(Ordering::Acquire))
    }

    /// Detach the current listener. Returns `false` if none was attached.
    pub fn deregister(&mut self) -> bool {
        match self.current.take() {
            Some(listener) => {
                listener.active.store(false, Ordering::Release);
                listener.task.abort();
                info!(listener = %listener.id, "Event listener detached");
                true
            }
            None => false,
        }
    }

    /// Forget a listener whose stream ended on its own.
    pub fn clear_ended(&mut self, id: ListenerId) {
        if self.current.as_ref().is_some_and(|l| l.id == id) {
            if let Some(listener) = self.current.take() {
                listener.active.store(false, Ordering::Release);
            }
            info!(listener = %id, "Event stream ended");
        }
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.deregister();
    }
}
