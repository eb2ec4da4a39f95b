use super::{AttemptOrigin, AttemptOutcome};
use crate::manager::{Inner, RealtimeEvent};
use crate::messaging::{decode_binary, safe_json_parse};
use crate::types::{RealtimeError, Result, StatusUpdate, TransportMode};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket factory for creating WebSocket connections
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Open a WebSocket connection, completing the handshake
    pub async fn create(url: &Url) -> Result<WsStream> {
        tracing::debug!(
            "Creating WebSocket connection to {}{}",
            url.host_str().unwrap_or_default(),
            url.path()
        );
        let (stream, response) = connect_async(url.as_str()).await?;
        tracing::debug!("WebSocket handshake answered {}", response.status());
        Ok(stream)
    }
}

impl<E: RealtimeEvent> Inner<E> {
    /// Opens the WebSocket transport and hands it to a reader task.
    ///
    /// Fails on token errors, handshake errors and the connect timeout.
    pub(crate) async fn connect_websocket(
        self: &Arc<Self>,
        generation: u64,
        origin: AttemptOrigin,
    ) -> Result<AttemptOutcome> {
        let token = self.resolve_token().await?;
        let url = self.transport_url(&self.config.endpoints.websocket, token.as_deref());

        if origin.publishes_progress()
            && !self.transition(
                Some(generation),
                StatusUpdate::new(TransportMode::Websocket, false),
            )
        {
            return Ok(AttemptOutcome::Discarded);
        }

        let connect_timeout = self.config.options.ws_connect_timeout();
        let stream = match time::timeout(connect_timeout, WebSocketFactory::create(&url)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RealtimeError::ConnectFailed {
                    transport: TransportMode::Websocket,
                    reason: e.to_string(),
                });
            }
            Err(_) => return Err(RealtimeError::ConnectTimeout(TransportMode::Websocket)),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let id = {
            let mut state = self.lock_state();
            if state.is_current(generation) {
                Some(state.install_transport(TransportMode::Websocket, shutdown_tx))
            } else {
                None
            }
        };
        let Some(id) = id else {
            tracing::debug!("Discarding WebSocket opened after stop");
            return Ok(AttemptOutcome::Discarded);
        };

        if !self.transition(
            Some(generation),
            StatusUpdate::new(TransportMode::Websocket, true),
        ) {
            return Ok(AttemptOutcome::Discarded);
        }

        tracing::info!("WebSocket transport connected");
        tokio::spawn(Arc::clone(self).run_websocket(generation, id, stream, shutdown_rx));
        Ok(AttemptOutcome::Opened)
    }

    fn run_websocket(
        self: Arc<Self>,
        generation: u64,
        id: u64,
        mut stream: WsStream,
        mut shutdown: oneshot::Receiver<()>,
    ) -> BoxFuture<'static, ()> {
        async move {
            tracing::debug!("Starting WebSocket read task {}", id);
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::debug!("Closing WebSocket transport {}", id);
                        if let Err(e) = stream.close(None).await {
                            tracing::debug!("WebSocket close failed: {}", e);
                        }
                        return;
                    }
                    frame = stream.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                self.handle_payload(
                                    id,
                                    TransportMode::Websocket,
                                    safe_json_parse(text.as_str()),
                                    None,
                                );
                            }
                            Some(Ok(Message::Binary(data))) => match decode_binary(&data) {
                                Some(payload) => {
                                    self.handle_payload(id, TransportMode::Websocket, payload, None)
                                }
                                None => tracing::debug!(
                                    "Dropping undecodable binary frame ({} bytes)",
                                    data.len()
                                ),
                            },
                            Some(Ok(Message::Close(frame))) => {
                                if let Some(close_frame) = frame {
                                    tracing::info!(
                                        "Server closed WebSocket: code={:?}, reason='{}'",
                                        close_frame.code,
                                        close_frame.reason
                                    );
                                } else {
                                    tracing::info!("Server closed WebSocket without close frame");
                                }
                                break;
                            }
                            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                            Some(Err(e)) => {
                                tracing::warn!("WebSocket read error: {}", e);
                                break;
                            }
                            None => {
                                tracing::info!("WebSocket stream ended");
                                break;
                            }
                        }
                    }
                }
            }
            self.handle_websocket_closed(generation, id);
        }
        .boxed()
    }

    /// A current WebSocket that closes hands over to SSE
    fn handle_websocket_closed(self: &Arc<Self>, generation: u64, id: u64) {
        let mut state = self.lock_state();
        if !state.is_current(generation) || !state.release_transport(id) {
            return;
        }
        tracing::warn!("WebSocket closed, falling back to SSE");
        state
            .tasks
            .spawn(Arc::clone(self).connect_sse_or_fallback(generation));
    }
}
