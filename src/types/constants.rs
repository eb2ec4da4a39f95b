/// Default delay between two poll cycles (milliseconds)
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 5_000;

/// Default minimum delay between two upgrade probes while polling (milliseconds)
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 30_000;

/// Default WebSocket connect timeout (milliseconds)
pub const DEFAULT_WS_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default SSE connect timeout (milliseconds)
pub const DEFAULT_SSE_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Query parameter carrying the token for transports without an Authorization header
pub const DEFAULT_TOKEN_QUERY_PARAM: &str = "access_token";

/// `last_error` published when an upgrade probe leaves the manager on polling
pub const DEGRADED_STATUS_MESSAGE: &str = "Realtime transport is degraded to polling mode";

/// Envelope keys (magic strings layer)
pub mod envelope {
    pub const EVENT_TYPE: &str = "event_type";
    pub const MESSAGE: &str = "message";
    pub const MESSAGE_EVENT: &str = "message";
}

/// Header values used by the HTTP transports
pub mod headers {
    pub const ACCEPT_JSON: &str = "application/json";
    pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";
}
