use super::{RealtimeEvent, RealtimeTransportManager};
use crate::infrastructure::{PollFetcher, ReqwestFetcher, TokenProvider, parse_endpoint};
use crate::messaging::{EnvelopeParser, EventParser, PayloadFn, TypedPayloadFn};
use crate::types::{
    DEFAULT_POLLING_INTERVAL_MS, DEFAULT_RECONNECT_INTERVAL_MS, DEFAULT_SSE_CONNECT_TIMEOUT_MS,
    DEFAULT_TOKEN_QUERY_PARAM, DEFAULT_WS_CONNECT_TIMEOUT_MS, QueryParams, RealtimeCursor,
    RealtimeError, RealtimeStatus, Result, TransportMode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Endpoints for the three transports. All URLs must be absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeEndpoints {
    pub websocket_url: String,
    pub sse_url: String,
    pub polling_url: String,
}

impl RealtimeEndpoints {
    pub fn new(
        websocket_url: impl Into<String>,
        sse_url: impl Into<String>,
        polling_url: impl Into<String>,
    ) -> Self {
        Self {
            websocket_url: websocket_url.into(),
            sse_url: sse_url.into(),
            polling_url: polling_url.into(),
        }
    }
}

/// Tunables. Every `None` falls back to the crate default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeTransportOptions {
    pub polling_interval_ms: Option<u64>,
    pub reconnect_interval_ms: Option<u64>,
    pub ws_connect_timeout_ms: Option<u64>,
    pub sse_connect_timeout_ms: Option<u64>,
    /// Put the auth token in the WebSocket/SSE URL query
    pub include_token_in_query: bool,
    pub token_query_param: Option<String>,
}

impl RealtimeTransportOptions {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(
            self.polling_interval_ms
                .unwrap_or(DEFAULT_POLLING_INTERVAL_MS),
        )
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(
            self.reconnect_interval_ms
                .unwrap_or(DEFAULT_RECONNECT_INTERVAL_MS),
        )
    }

    pub fn ws_connect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.ws_connect_timeout_ms
                .unwrap_or(DEFAULT_WS_CONNECT_TIMEOUT_MS),
        )
    }

    pub fn sse_connect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.sse_connect_timeout_ms
                .unwrap_or(DEFAULT_SSE_CONNECT_TIMEOUT_MS),
        )
    }

    pub fn token_query_param(&self) -> &str {
        self.token_query_param
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_QUERY_PARAM)
    }

    fn validate(&self) -> Result<()> {
        let tunables = [
            ("polling_interval_ms", self.polling_interval_ms),
            ("reconnect_interval_ms", self.reconnect_interval_ms),
            ("ws_connect_timeout_ms", self.ws_connect_timeout_ms),
            ("sse_connect_timeout_ms", self.sse_connect_timeout_ms),
        ];
        for (name, value) in tunables {
            if value == Some(0) {
                return Err(RealtimeError::Config(format!("{} must be positive", name)));
            }
        }
        if self.token_query_param.as_deref() == Some("") {
            return Err(RealtimeError::Config(
                "token_query_param must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) type CursorExtractor<E> = Box<dyn Fn(&E) -> Option<RealtimeCursor> + Send + Sync>;
pub(crate) type PollQueryBuilder =
    Box<dyn Fn(Option<&RealtimeCursor>) -> Option<QueryParams> + Send + Sync>;
pub(crate) type EventCallback<E> = Box<dyn Fn(&E) + Send + Sync>;
pub(crate) type StatusCallback = Box<dyn Fn(&RealtimeStatus) + Send + Sync>;

pub(crate) struct ResolvedEndpoints {
    pub websocket: Url,
    pub sse: Url,
    pub polling: Url,
}

/// Immutable configuration owned by a manager
pub(crate) struct TransportConfig<E> {
    pub endpoints: ResolvedEndpoints,
    pub options: RealtimeTransportOptions,
    pub token_provider: Option<Arc<dyn TokenProvider>>,
    pub websocket_parser: Box<dyn EventParser<E>>,
    pub sse_parser: Box<dyn EventParser<E>>,
    pub poll_item_parser: Box<dyn EventParser<E>>,
    pub cursor_from_event: Option<CursorExtractor<E>>,
    pub build_poll_query: Option<PollQueryBuilder>,
    pub on_event: Option<EventCallback<E>>,
    pub on_degraded_to_polling: Option<StatusCallback>,
    pub fetcher: Arc<dyn PollFetcher>,
    pub http: reqwest::Client,
    pub initial_cursor: Option<RealtimeCursor>,
}

impl<E> TransportConfig<E> {
    pub fn parser_for(&self, mode: TransportMode) -> &dyn EventParser<E> {
        match mode {
            TransportMode::Websocket => self.websocket_parser.as_ref(),
            TransportMode::Sse => self.sse_parser.as_ref(),
            TransportMode::Polling | TransportMode::Disconnected => {
                self.poll_item_parser.as_ref()
            }
        }
    }
}

/// Builder for [`RealtimeTransportManager`].
///
/// Every callback is optional; parsers default to [`EnvelopeParser`].
///
/// ```no_run
/// use realtime_transport::{RealtimeCursor, RealtimeEndpoints, RealtimeTransportBuilder};
/// use realtime_transport::{QueryParams, RealtimeTransportOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = RealtimeTransportBuilder::<serde_json::Value>::new(
///     RealtimeEndpoints::new(
///         "wss://api.example.com/v1/chat/ws",
///         "https://api.example.com/v1/chat/stream",
///         "https://api.example.com/v1/chat/messages",
///     ),
///     RealtimeTransportOptions::default(),
/// )?
/// .cursor_from_event(|event| {
///     event["message_id"]
///         .as_str()
///         .map(|id| RealtimeCursor::new().with_message_id(id))
/// })
/// .poll_query(|cursor| {
///     Some(QueryParams::new().append_opt(
///         "since_message_id",
///         cursor.and_then(|c| c.since_message_id.clone()),
///     ))
/// })
/// .build();
/// # Ok(())
/// # }
/// ```
pub struct RealtimeTransportBuilder<E> {
    endpoints: ResolvedEndpoints,
    options: RealtimeTransportOptions,
    token_provider: Option<Arc<dyn TokenProvider>>,
    websocket_parser: Option<Box<dyn EventParser<E>>>,
    sse_parser: Option<Box<dyn EventParser<E>>>,
    poll_item_parser: Option<Box<dyn EventParser<E>>>,
    cursor_from_event: Option<CursorExtractor<E>>,
    build_poll_query: Option<PollQueryBuilder>,
    on_event: Option<EventCallback<E>>,
    on_degraded_to_polling: Option<StatusCallback>,
    fetcher: Option<Arc<dyn PollFetcher>>,
    http: reqwest::Client,
    initial_cursor: Option<RealtimeCursor>,
}

impl<E: RealtimeEvent> RealtimeTransportBuilder<E> {
    /// Validates endpoints and options.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::UrlParse`] for a malformed URL, [`RealtimeError::Config`]
    /// for a wrong scheme or a zero tunable.
    pub fn new(endpoints: RealtimeEndpoints, options: RealtimeTransportOptions) -> Result<Self> {
        options.validate()?;
        let endpoints = ResolvedEndpoints {
            websocket: parse_endpoint(&endpoints.websocket_url, &["ws", "wss"])?,
            sse: parse_endpoint(&endpoints.sse_url, &["http", "https"])?,
            polling: parse_endpoint(&endpoints.polling_url, &["http", "https"])?,
        };

        Ok(Self {
            endpoints,
            options,
            token_provider: None,
            websocket_parser: None,
            sse_parser: None,
            poll_item_parser: None,
            cursor_from_event: None,
            build_poll_query: None,
            on_event: None,
            on_degraded_to_polling: None,
            fetcher: None,
            http: ReqwestFetcher::default_client()?,
            initial_cursor: None,
        })
    }

    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    pub fn websocket_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(Value) -> Option<E> + Send + Sync + 'static,
    {
        self.websocket_parser = Some(Box::new(PayloadFn(parser)));
        self
    }

    /// SSE parser; receives the SSE event name alongside the payload
    pub fn sse_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(Value, Option<&str>) -> Option<E> + Send + Sync + 'static,
    {
        self.sse_parser = Some(Box::new(TypedPayloadFn(parser)));
        self
    }

    pub fn poll_item_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(Value) -> Option<E> + Send + Sync + 'static,
    {
        self.poll_item_parser = Some(Box::new(PayloadFn(parser)));
        self
    }

    /// Installs a parser strategy for one transport. `Disconnected` is ignored.
    pub fn parser(mut self, mode: TransportMode, parser: impl EventParser<E> + 'static) -> Self {
        let parser: Box<dyn EventParser<E>> = Box::new(parser);
        match mode {
            TransportMode::Websocket => self.websocket_parser = Some(parser),
            TransportMode::Sse => self.sse_parser = Some(parser),
            TransportMode::Polling => self.poll_item_parser = Some(parser),
            TransportMode::Disconnected => {
                tracing::warn!("Ignoring parser registered for the disconnected mode");
            }
        }
        self
    }

    pub fn cursor_from_event<F>(mut self, extract: F) -> Self
    where
        F: Fn(&E) -> Option<RealtimeCursor> + Send + Sync + 'static,
    {
        self.cursor_from_event = Some(Box::new(extract));
        self
    }

    pub fn poll_query<F>(mut self, build: F) -> Self
    where
        F: Fn(Option<&RealtimeCursor>) -> Option<QueryParams> + Send + Sync + 'static,
    {
        self.build_poll_query = Some(Box::new(build));
        self
    }

    /// Called for every emitted event, before subscribers
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.on_event = Some(Box::new(callback));
        self
    }

    /// Called once per transition into polling
    pub fn on_degraded_to_polling<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RealtimeStatus) + Send + Sync + 'static,
    {
        self.on_degraded_to_polling = Some(Box::new(callback));
        self
    }

    pub fn fetcher(mut self, fetcher: impl PollFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// HTTP client for SSE and the default poll fetcher
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Cursor handed to the first poll query
    pub fn initial_cursor(mut self, cursor: RealtimeCursor) -> Self {
        self.initial_cursor = Some(cursor);
        self
    }

    pub fn build(self) -> RealtimeTransportManager<E> {
        let http = self.http;
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(ReqwestFetcher::new(http.clone())));

        let config = TransportConfig {
            endpoints: self.endpoints,
            options: self.options,
            token_provider: self.token_provider,
            websocket_parser: self
                .websocket_parser
                .unwrap_or_else(|| Box::new(EnvelopeParser::<E>::new())),
            sse_parser: self
                .sse_parser
                .unwrap_or_else(|| Box::new(EnvelopeParser::<E>::new())),
            poll_item_parser: self
                .poll_item_parser
                .unwrap_or_else(|| Box::new(EnvelopeParser::<E>::new())),
            cursor_from_event: self.cursor_from_event,
            build_poll_query: self.build_poll_query,
            on_event: self.on_event,
            on_degraded_to_polling: self.on_degraded_to_polling,
            fetcher,
            http,
            initial_cursor: self.initial_cursor,
        };

        RealtimeTransportManager::from_config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> RealtimeEndpoints {
        RealtimeEndpoints::new(
            "wss://api.example.com/ws",
            "https://api.example.com/stream",
            "https://api.example.com/poll",
        )
    }

    #[test]
    fn test_option_defaults() {
        let options = RealtimeTransportOptions::default();
        assert_eq!(options.polling_interval(), Duration::from_secs(5));
        assert_eq!(options.reconnect_interval(), Duration::from_secs(30));
        assert_eq!(options.ws_connect_timeout(), Duration::from_secs(5));
        assert_eq!(options.sse_connect_timeout(), Duration::from_secs(5));
        assert_eq!(options.token_query_param(), "access_token");
        assert!(!options.include_token_in_query);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: RealtimeTransportOptions = serde_json::from_str(
            r#"{ "polling_interval_ms": 1500, "include_token_in_query": true }"#,
        )
        .unwrap();
        assert_eq!(options.polling_interval(), Duration::from_millis(1500));
        assert_eq!(options.reconnect_interval(), Duration::from_secs(30));
        assert!(options.include_token_in_query);
    }

    #[test]
    fn test_builder_rejects_bad_endpoints() {
        let mut bad_scheme = endpoints();
        bad_scheme.websocket_url = "https://api.example.com/ws".to_string();
        assert!(matches!(
            RealtimeTransportBuilder::<Value>::new(bad_scheme, Default::default()),
            Err(RealtimeError::Config(_))
        ));

        let mut malformed = endpoints();
        malformed.polling_url = "not a url".to_string();
        assert!(matches!(
            RealtimeTransportBuilder::<Value>::new(malformed, Default::default()),
            Err(RealtimeError::UrlParse(_))
        ));
    }

    #[test]
    fn test_builder_rejects_zero_tunables() {
        let options = RealtimeTransportOptions {
            ws_connect_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            RealtimeTransportBuilder::<Value>::new(endpoints(), options),
            Err(RealtimeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_builder_selects_parser_per_transport() {
        let manager = RealtimeTransportBuilder::<Value>::new(endpoints(), Default::default())
            .unwrap()
            .websocket_parser(|_| Some(Value::from("ws")))
            .sse_parser(|_, event_type| event_type.map(Value::from))
            .build();

        let config = &manager.inner.config;
        assert_eq!(
            config
                .parser_for(TransportMode::Websocket)
                .parse(Value::Null, None),
            Some(Value::from("ws"))
        );
        assert_eq!(
            config
                .parser_for(TransportMode::Sse)
                .parse(Value::Null, Some("feed")),
            Some(Value::from("feed"))
        );
        // Polling keeps the envelope default
        assert_eq!(
            config.parser_for(TransportMode::Polling).parse(
                serde_json::json!({ "event_type": "message", "message": { "id": 1 } }),
                None
            ),
            Some(serde_json::json!({ "id": 1 }))
        );
    }

    #[tokio::test]
    async fn test_parser_registers_strategy_by_mode() {
        let manager = RealtimeTransportBuilder::<Value>::new(endpoints(), Default::default())
            .unwrap()
            .parser(
                TransportMode::Polling,
                PayloadFn(|payload: Value| payload.get("seq").cloned()),
            )
            .parser(
                TransportMode::Disconnected,
                PayloadFn(|_: Value| Some(Value::from("ignored"))),
            )
            .build();

        let config = &manager.inner.config;
        assert_eq!(
            config
                .parser_for(TransportMode::Polling)
                .parse(serde_json::json!({ "seq": 4 }), None),
            Some(Value::from(4))
        );
        // The disconnected registration leaves the streaming defaults alone
        assert_eq!(
            config
                .parser_for(TransportMode::Websocket)
                .parse(serde_json::json!({ "seq": 4 }), None),
            Some(serde_json::json!({ "seq": 4 }))
        );
    }
}
