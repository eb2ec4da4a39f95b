// Transport module - the WebSocket, SSE and polling connectors
pub mod polling;
pub mod sse;
pub mod websocket;

pub use websocket::{WebSocketFactory, WsStream};

/// Who asked for a connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOrigin {
    /// Part of the start-up fallback chain; publishes a connecting status
    Fallback,
    /// A silent probe made while degraded to polling
    UpgradeProbe,
}

impl AttemptOrigin {
    pub fn publishes_progress(self) -> bool {
        self == Self::Fallback
    }
}

/// Result of an attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// The transport is open and owns the connection slot
    Opened,
    /// The manager was stopped or restarted mid-attempt; the connection was dropped
    Discarded,
}
