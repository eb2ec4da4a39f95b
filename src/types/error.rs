use thiserror::Error;
use tokio_tungstenite::tungstenite;

use super::TransportMode;

/// Errors produced by the realtime transport.
///
/// Connection-stage errors never reach the caller of `start()`; they are
/// recorded in [`RealtimeStatus::last_error`](super::RealtimeStatus) and drive
/// the fallback chain instead.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// The transport did not open before its connect timeout elapsed
    #[error("{} connection timed out", .0.label())]
    ConnectTimeout(TransportMode),

    /// The transport failed while opening
    #[error("{} connection error: {reason}", .transport.label())]
    ConnectFailed {
        transport: TransportMode,
        reason: String,
    },

    /// An already open transport failed
    #[error("{} stream error: {reason}", .transport.label())]
    StreamFailed {
        transport: TransportMode,
        reason: String,
    },

    /// The polling endpoint answered with a non-2xx status
    #[error("Polling failed with status {0}")]
    PollStatus(u16),

    /// The polling endpoint answered with something other than a JSON array
    #[error("Polling response must be an array payload")]
    PollPayload,

    /// HTTP request error (polling transport)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The token provider failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RealtimeError {
    /// Returns true for failures raised while a transport was opening.
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout(_) | Self::ConnectFailed { .. } | Self::WebSocket(_)
        )
    }
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
