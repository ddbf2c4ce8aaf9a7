//! Notifications adapters raise for the host page

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Name of the page event carrying [`HostEvent::ChainChanged`]
pub const CHAIN_CHANGED_EVENT: &str = "bitgame_wallet_chain_changed";

/// Something the host should react to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// The wallet moved to a chain whose native coin is `currency`
    ChainChanged {
        /// Currency code the host should switch to
        currency: String,
    },
    /// The wallet state changed underneath the page; reload it
    ReloadRequested,
}

impl HostEvent {
    /// The page-level event name
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::ChainChanged { .. } => CHAIN_CHANGED_EVENT,
            HostEvent::ReloadRequested => "reload",
        }
    }
}

/// Broadcast bus for [`HostEvent`]s
#[derive(Debug, Clone)]
pub struct HostEvents {
    tx: broadcast::Sender<HostEvent>,
}

impl HostEvents {
    /// Creates a bus keeping up to `capacity` undelivered events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Starts receiving events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    /// Emits an event; dropped silently when nobody listens
    pub fn emit(&self, event: HostEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!(event = name, "host event dropped, no receivers");
        }
    }
}

impl Default for HostEvents {
    fn default() -> Self {
        Self::new(16)
    }
}
