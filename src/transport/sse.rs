use super::{AttemptOrigin, AttemptOutcome};
use crate::manager::{Inner, RealtimeEvent};
use crate::messaging::safe_json_parse;
use crate::types::{RealtimeError, Result, StatusUpdate, TransportMode, headers};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use reqwest::header::ACCEPT;
use reqwest_eventsource::{Event, EventSource, retry};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time;

impl<E: RealtimeEvent> Inner<E> {
    /// Opens the SSE transport. The source is open once the server answers
    /// with an event stream, or once the first message arrives.
    pub(crate) async fn connect_sse(
        self: &Arc<Self>,
        generation: u64,
        origin: AttemptOrigin,
    ) -> Result<AttemptOutcome> {
        let token = self.resolve_token().await?;
        let url = self.transport_url(&self.config.endpoints.sse, token.as_deref());

        if origin.publishes_progress()
            && !self.transition(Some(generation), StatusUpdate::new(TransportMode::Sse, false))
        {
            return Ok(AttemptOutcome::Discarded);
        }

        let request = self
            .config
            .http
            .get(url)
            .header(ACCEPT, headers::ACCEPT_EVENT_STREAM);
        let mut source = EventSource::new(request).map_err(|e| RealtimeError::ConnectFailed {
            transport: TransportMode::Sse,
            reason: e.to_string(),
        })?;
        // Reconnection is owned by the fallback chain
        source.set_retry_policy(Box::new(retry::Never));

        let connect_timeout = self.config.options.sse_connect_timeout();
        let first_message = match time::timeout(connect_timeout, source.next()).await {
            Ok(Some(Ok(Event::Open))) => None,
            Ok(Some(Ok(Event::Message(message)))) => Some((message.event, message.data)),
            Ok(Some(Err(e))) => {
                source.close();
                return Err(RealtimeError::ConnectFailed {
                    transport: TransportMode::Sse,
                    reason: e.to_string(),
                });
            }
            Ok(None) => {
                return Err(RealtimeError::ConnectFailed {
                    transport: TransportMode::Sse,
                    reason: "stream ended before opening".to_string(),
                });
            }
            Err(_) => {
                source.close();
                return Err(RealtimeError::ConnectTimeout(TransportMode::Sse));
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let id = {
            let mut state = self.lock_state();
            if state.is_current(generation) {
                Some(state.install_transport(TransportMode::Sse, shutdown_tx))
            } else {
                None
            }
        };
        let Some(id) = id else {
            tracing::debug!("Discarding SSE stream opened after stop");
            source.close();
            return Ok(AttemptOutcome::Discarded);
        };

        if !self.transition(Some(generation), StatusUpdate::new(TransportMode::Sse, true)) {
            source.close();
            return Ok(AttemptOutcome::Discarded);
        }

        tracing::info!("SSE transport connected");
        if let Some((event_type, data)) = first_message {
            self.handle_sse_message(id, &event_type, &data);
        }
        tokio::spawn(Arc::clone(self).run_sse(generation, id, source, shutdown_rx));
        Ok(AttemptOutcome::Opened)
    }

    fn run_sse(
        self: Arc<Self>,
        generation: u64,
        id: u64,
        mut source: EventSource,
        mut shutdown: oneshot::Receiver<()>,
    ) -> BoxFuture<'static, ()> {
        async move {
            let error = loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::debug!("Closing SSE transport {}", id);
                        source.close();
                        return;
                    }
                    next = source.next() => {
                        match next {
                            Some(Ok(Event::Open)) => tracing::debug!("SSE stream reopened"),
                            Some(Ok(Event::Message(message))) => {
                                self.handle_sse_message(id, &message.event, &message.data);
                            }
                            Some(Err(e)) => break stream_failed(e.to_string()),
                            None => break stream_failed("stream ended".to_string()),
                        }
                    }
                }
            };
            source.close();
            self.handle_sse_failed(generation, id, error);
        }
        .boxed()
    }

    fn handle_sse_message(&self, id: u64, event_type: &str, data: &str) {
        self.handle_payload(id, TransportMode::Sse, safe_json_parse(data), Some(event_type));
    }

    /// A current SSE stream that errors degrades straight to polling
    fn handle_sse_failed(self: &Arc<Self>, generation: u64, id: u64, error: RealtimeError) {
        {
            let mut state = self.lock_state();
            if !state.is_current(generation) || !state.release_transport(id) {
                return;
            }
        }
        tracing::warn!("{}, falling back to polling", error);
        self.start_polling(generation);
    }
}

fn stream_failed(reason: String) -> RealtimeError {
    RealtimeError::StreamFailed {
        transport: TransportMode::Sse,
        reason,
    }
}
