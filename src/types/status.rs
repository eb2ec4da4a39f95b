use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The transport currently carrying events. Exactly one mode is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Websocket,
    Sse,
    Polling,
    Disconnected,
}

impl TransportMode {
    /// Wire name (`websocket`, `sse`, `polling`, `disconnected`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::Sse => "sse",
            Self::Polling => "polling",
            Self::Disconnected => "disconnected",
        }
    }

    /// Human readable name used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Websocket => "WebSocket",
            Self::Sse => "SSE",
            Self::Polling => "Polling",
            Self::Disconnected => "Disconnected",
        }
    }

    /// Parse a wire name, `None` for unknown modes
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "websocket" => Some(Self::Websocket),
            "sse" => Some(Self::Sse),
            "polling" => Some(Self::Polling),
            "disconnected" => Some(Self::Disconnected),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of the transport status.
///
/// Every transition produces a new snapshot with a fresh
/// `last_transition_at_ms`. `is_connected` is only true while a transport is
/// open, or while polling cycles succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStatus {
    pub mode: TransportMode,
    pub is_connected: bool,
    pub last_error: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "lastTransitionAt")]
    pub last_transition_at_ms: u64,
}

impl RealtimeStatus {
    /// The status of a manager that has never started
    pub fn disconnected() -> Self {
        Self {
            mode: TransportMode::Disconnected,
            is_connected: false,
            last_error: None,
            last_transition_at_ms: now_ms(),
        }
    }

    /// Copy-merge an update into a new snapshot stamped with the current time
    pub fn merge(&self, update: StatusUpdate) -> Self {
        Self {
            mode: update.mode,
            is_connected: update.is_connected,
            last_error: update.last_error,
            last_transition_at_ms: now_ms().max(self.last_transition_at_ms),
        }
    }
}

impl Default for RealtimeStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// A requested status transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub mode: TransportMode,
    pub is_connected: bool,
    pub last_error: Option<String>,
}

impl StatusUpdate {
    pub fn new(mode: TransportMode, is_connected: bool) -> Self {
        Self {
            mode,
            is_connected,
            last_error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    /// `disconnected` with an optional reason
    pub fn disconnected(error: Option<String>) -> Self {
        Self {
            mode: TransportMode::Disconnected,
            is_connected: false,
            last_error: error,
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_mode_wire_names() {
        for mode in [
            TransportMode::Websocket,
            TransportMode::Sse,
            TransportMode::Polling,
            TransportMode::Disconnected,
        ] {
            assert_eq!(TransportMode::parse(mode.as_str()), Some(mode));
            assert_eq!(
                serde_json::to_string(&mode).unwrap(),
                format!("\"{}\"", mode.as_str())
            );
        }
        assert_eq!(TransportMode::parse("carrier-pigeon"), None);
    }

    #[test]
    fn test_merge_replaces_fields_and_stamps_time() {
        let initial = RealtimeStatus::disconnected();
        let next = initial.merge(
            StatusUpdate::new(TransportMode::Polling, false).with_error("Polling failed"),
        );

        assert_eq!(next.mode, TransportMode::Polling);
        assert!(!next.is_connected);
        assert_eq!(next.last_error.as_deref(), Some("Polling failed"));
        assert!(next.last_transition_at_ms >= initial.last_transition_at_ms);

        // The source snapshot is untouched
        assert_eq!(initial.mode, TransportMode::Disconnected);
    }

    #[test]
    fn test_status_serializes_with_camel_case_names() {
        let status = RealtimeStatus {
            mode: TransportMode::Sse,
            is_connected: true,
            last_error: None,
            last_transition_at_ms: 42,
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mode": "sse",
                "isConnected": true,
                "lastError": null,
                "lastTransitionAt": 42
            })
        );
    }
}
