use super::{Inner, RealtimeEvent};
use crate::transport::AttemptOrigin;
use crate::types::{StatusUpdate, TransportMode};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;

impl<E: RealtimeEvent> Inner<E> {
    /// WebSocket first; on failure publish the error and move on to SSE
    pub(crate) fn connect_websocket_or_fallback(
        self: Arc<Self>,
        generation: u64,
    ) -> BoxFuture<'static, ()> {
        async move {
            let Err(error) = self
                .connect_websocket(generation, AttemptOrigin::Fallback)
                .await
            else {
                return;
            };
            if !self.is_current(generation) {
                return;
            }

            tracing::warn!("WebSocket unavailable, falling back to SSE: {}", error);
            self.transition(
                Some(generation),
                StatusUpdate::disconnected(Some(error.to_string())),
            );
            self.connect_sse_or_fallback(generation).await;
        }
        .boxed()
    }

    /// SSE next; on failure publish the error and degrade to polling
    pub(crate) fn connect_sse_or_fallback(
        self: Arc<Self>,
        generation: u64,
    ) -> BoxFuture<'static, ()> {
        async move {
            let Err(error) = self.connect_sse(generation, AttemptOrigin::Fallback).await else {
                return;
            };
            if !self.is_current(generation) {
                return;
            }

            tracing::warn!("SSE unavailable, falling back to polling: {}", error);
            self.transition(
                Some(generation),
                StatusUpdate::disconnected(Some(error.to_string())),
            );
            self.start_polling(generation);
        }
        .boxed()
    }

    /// Enters polling mode and (re)starts the poll loop.
    ///
    /// The probe gate is reopened, so the first poll cycle is followed by an
    /// upgrade probe.
    pub(crate) fn start_polling(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.lock_state();
            if !state.is_current(generation) {
                return;
            }
            state.close_transport();
            state.abort_poll_task();
            state.probe_timer.reset();
        }

        if !self.transition(
            Some(generation),
            StatusUpdate::new(TransportMode::Polling, true),
        ) {
            return;
        }
        tracing::info!(
            "Degraded to polling every {:?}",
            self.config.options.polling_interval()
        );

        let mut state = self.lock_state();
        if !state.is_current(generation) {
            return;
        }
        let handle = tokio::spawn(Arc::clone(self).run_polling(generation));
        state.abort_poll_task();
        state.poll_task = Some(handle.abort_handle());
    }
}
