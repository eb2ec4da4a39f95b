use super::{AttemptOrigin, AttemptOutcome};
use crate::infrastructure::{PollRequest, with_query};
use crate::manager::{Inner, RealtimeEvent};
use crate::types::{DEGRADED_STATUS_MESSAGE, RealtimeError, Result, StatusUpdate, TransportMode};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

impl<E: RealtimeEvent> Inner<E> {
    /// Poll loop: one cycle per interval, each followed by an upgrade probe
    /// when one is due. Ends when the manager stops or a probe promotes the
    /// connection.
    pub(crate) fn run_polling(self: Arc<Self>, generation: u64) -> BoxFuture<'static, ()> {
        async move {
            let interval = self.config.options.polling_interval();
            let mut delay = Duration::ZERO;

            loop {
                time::sleep(delay).await;
                if !self.is_current(generation) {
                    break;
                }

                let update = match self.poll_once(generation).await {
                    Ok(count) => {
                        tracing::debug!("Poll cycle delivered {} events", count);
                        StatusUpdate::new(TransportMode::Polling, true)
                    }
                    Err(e) => {
                        tracing::warn!("Poll cycle failed: {}", e);
                        StatusUpdate::new(TransportMode::Polling, false).with_error(e.to_string())
                    }
                };
                if !self.transition(Some(generation), update) {
                    break;
                }

                self.try_upgrade_from_polling(generation).await;
                if !self.is_current(generation)
                    || self.status().mode != TransportMode::Polling
                {
                    break;
                }
                delay = interval;
            }
            tracing::debug!("Poll loop finished");
        }
        .boxed()
    }

    /// Runs a single poll request and emits every parsed item in order.
    /// Returns the number of emitted events.
    pub(crate) async fn poll_once(&self, generation: u64) -> Result<usize> {
        let token = self.resolve_token().await?;
        let cursor = self.lock_state().cursor.clone();
        let query = self
            .config
            .build_poll_query
            .as_ref()
            .and_then(|build| build(cursor.as_ref()));
        let url = with_query(&self.config.endpoints.polling, query.as_ref());

        let response = self
            .config
            .fetcher
            .fetch(PollRequest::new(url, token.as_deref()))
            .await?;
        if !response.is_success() {
            return Err(RealtimeError::PollStatus(response.status));
        }

        let Value::Array(items) = serde_json::from_slice::<Value>(&response.body)? else {
            return Err(RealtimeError::PollPayload);
        };

        let mut emitted = 0;
        for item in items {
            if !self.is_current(generation) {
                break;
            }
            match self.config.poll_item_parser.parse(item, None) {
                Some(event) => {
                    self.emit_event(event);
                    emitted += 1;
                }
                None => tracing::trace!("Dropping unparsed poll item"),
            }
        }
        Ok(emitted)
    }

    /// Tries WebSocket then SSE once the reconnect interval has elapsed.
    ///
    /// Probes are silent: a failure leaves the manager in polling with the
    /// degraded message as its last error.
    pub(crate) async fn try_upgrade_from_polling(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.lock_state();
            if !state.is_current(generation)
                || state.status.mode != TransportMode::Polling
                || !state.probe_timer.try_begin(Instant::now())
            {
                return;
            }
        }
        tracing::debug!("Probing realtime transports from polling");

        match self
            .connect_websocket(generation, AttemptOrigin::UpgradeProbe)
            .await
        {
            Ok(AttemptOutcome::Opened) => {
                tracing::info!("Promoted from polling to WebSocket");
                return;
            }
            Ok(AttemptOutcome::Discarded) => return,
            Err(e) => tracing::debug!("WebSocket probe failed: {}", e),
        }
        if !self.is_current(generation) {
            return;
        }

        match self.connect_sse(generation, AttemptOrigin::UpgradeProbe).await {
            Ok(AttemptOutcome::Opened) => {
                tracing::info!("Promoted from polling to SSE");
                return;
            }
            Ok(AttemptOutcome::Discarded) => return,
            Err(e) => tracing::debug!("SSE probe failed: {}", e),
        }

        self.transition(
            Some(generation),
            StatusUpdate::new(TransportMode::Polling, true).with_error(DEGRADED_STATUS_MESSAGE),
        );
    }
}
