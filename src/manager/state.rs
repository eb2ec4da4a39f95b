use crate::infrastructure::{ProbeTimer, TaskManager};
use crate::types::{RealtimeCursor, RealtimeStatus, StatusUpdate, TransportMode};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// The transport currently owning the connection slot
#[derive(Debug)]
pub(crate) struct ActiveTransport {
    pub id: u64,
    pub mode: TransportMode,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ActiveTransport {
    fn close(mut self) {
        tracing::debug!("Closing {} transport {}", self.mode, self.id);
        if let Some(shutdown) = self.shutdown.take() {
            // The reader may already be gone
            let _ = shutdown.send(());
        }
    }
}

/// A status applied under the state lock, waiting for delivery
#[derive(Debug, Clone)]
pub(crate) struct StatusChange {
    pub status: RealtimeStatus,
    pub entered_polling: bool,
}

/// Mutable state of a manager. Every field is guarded by one lock.
pub(crate) struct ManagerState {
    pub stopped: bool,
    /// Bumped on every start and stop; work from an older generation is stale
    pub generation: u64,
    next_transport_id: u64,
    pub active: Option<ActiveTransport>,
    pub poll_task: Option<AbortHandle>,
    pub tasks: TaskManager,
    pub cursor: Option<RealtimeCursor>,
    pub probe_timer: ProbeTimer,
    pub status: RealtimeStatus,
}

impl ManagerState {
    pub fn new(reconnect_interval: Duration, cursor: Option<RealtimeCursor>) -> Self {
        Self {
            stopped: true,
            generation: 0,
            next_transport_id: 0,
            active: None,
            poll_task: None,
            tasks: TaskManager::new(),
            cursor,
            probe_timer: ProbeTimer::new(reconnect_interval),
            status: RealtimeStatus::disconnected(),
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        !self.stopped && self.generation == generation
    }

    pub fn is_transport_current(&self, id: u64) -> bool {
        !self.stopped && self.active.as_ref().is_some_and(|t| t.id == id)
    }

    /// Moves out of the stopped state. Returns the new generation, or `None`
    /// if the manager was already running.
    pub fn begin(&mut self) -> Option<u64> {
        if !self.stopped {
            return None;
        }
        self.stopped = false;
        self.generation += 1;
        self.probe_timer.reset();
        Some(self.generation)
    }

    /// Cancels everything in flight and marks the state stopped
    pub fn halt(&mut self) {
        self.stopped = true;
        self.generation += 1;
        self.probe_timer.reset();
        self.close_transport();
        self.abort_poll_task();
        self.tasks.abort_all();
    }

    /// Takes the slot for a freshly opened transport, closing any previous one
    pub fn install_transport(&mut self, mode: TransportMode, shutdown: oneshot::Sender<()>) -> u64 {
        self.close_transport();
        self.next_transport_id += 1;
        self.active = Some(ActiveTransport {
            id: self.next_transport_id,
            mode,
            shutdown: Some(shutdown),
        });
        self.next_transport_id
    }

    /// Frees the slot if `id` still holds it
    pub fn release_transport(&mut self, id: u64) -> bool {
        if self.active.as_ref().is_some_and(|t| t.id == id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn close_transport(&mut self) {
        if let Some(active) = self.active.take() {
            active.close();
        }
    }

    pub fn abort_poll_task(&mut self) {
        if let Some(handle) = self.poll_task.take() {
            handle.abort();
        }
    }

    pub fn apply(&mut self, update: StatusUpdate) -> StatusChange {
        let was_polling = self.status.mode == TransportMode::Polling;
        self.status = self.status.merge(update);
        StatusChange {
            status: self.status.clone(),
            entered_polling: !was_polling && self.status.mode == TransportMode::Polling,
        }
    }
}
