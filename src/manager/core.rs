use super::builder::{RealtimeEndpoints, RealtimeTransportBuilder, RealtimeTransportOptions, TransportConfig};
use super::state::{ManagerState, StatusChange};
use crate::infrastructure::auth::resolve_token;
use crate::infrastructure::with_token;
use crate::messaging::{ListenerRegistry, OrderedDispatch, Subscription};
use crate::types::{RealtimeCursor, RealtimeStatus, Result, StatusUpdate, TransportMode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use url::Url;

/// Application events carried by the manager.
///
/// Implemented for every `DeserializeOwned + Send + Sync + 'static` type, so
/// the default parsers can decode payloads straight into it.
pub trait RealtimeEvent: DeserializeOwned + Send + Sync + 'static {}

impl<T> RealtimeEvent for T where T: DeserializeOwned + Send + Sync + 'static {}

/// Keeps one realtime connection alive, falling back from WebSocket to SSE
/// to HTTP polling and probing its way back up while degraded.
///
/// Cloning is cheap; clones share the same connection.
pub struct RealtimeTransportManager<E> {
    pub(crate) inner: Arc<Inner<E>>,
}

impl<E> Clone for RealtimeTransportManager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct Inner<E> {
    pub(crate) config: TransportConfig<E>,
    state: Mutex<ManagerState>,
    listeners: ListenerRegistry<E>,
    status_listeners: ListenerRegistry<RealtimeStatus>,
    status_dispatch: OrderedDispatch<StatusChange>,
    status_tx: watch::Sender<RealtimeStatus>,
}

impl<E: RealtimeEvent> RealtimeTransportManager<E> {
    /// Creates a manager with the default envelope parsers and no callbacks.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - WebSocket, SSE and polling URLs
    /// * `options` - Intervals, timeouts and token placement
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not an absolute URL with a scheme
    /// matching its transport, or if a tunable is zero.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use realtime_transport::{RealtimeEndpoints, RealtimeTransportManager};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let manager = RealtimeTransportManager::<serde_json::Value>::new(
    ///         RealtimeEndpoints::new(
    ///             "wss://api.example.com/ws",
    ///             "https://api.example.com/stream",
    ///             "https://api.example.com/poll",
    ///         ),
    ///         Default::default(),
    ///     )?;
    ///
    ///     let _subscription = manager.subscribe(|event| println!("{event}"));
    ///     manager.start().await;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(endpoints: RealtimeEndpoints, options: RealtimeTransportOptions) -> Result<Self> {
        Ok(RealtimeTransportBuilder::new(endpoints, options)?.build())
    }

    /// Starts a builder; see [`RealtimeTransportBuilder`]
    pub fn builder(
        endpoints: RealtimeEndpoints,
        options: RealtimeTransportOptions,
    ) -> Result<RealtimeTransportBuilder<E>> {
        RealtimeTransportBuilder::new(endpoints, options)
    }

    pub(crate) fn from_config(config: TransportConfig<E>) -> Self {
        let state = ManagerState::new(
            config.options.reconnect_interval(),
            config.initial_cursor.clone(),
        );
        let (status_tx, _) = watch::channel(state.status.clone());

        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                listeners: ListenerRegistry::new(),
                status_listeners: ListenerRegistry::new(),
                status_dispatch: OrderedDispatch::new(),
                status_tx,
            }),
        }
    }

    /// Runs the fallback chain: WebSocket, then SSE, then polling.
    ///
    /// Resolves once a transport is open, polling has started, or the chain
    /// was cancelled by [`stop`](Self::stop). Never returns an error; failures
    /// are reported through status updates.
    ///
    /// Calling `start` while running, or outside a Tokio runtime, does nothing.
    pub async fn start(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("No Tokio runtime available, realtime transport not started");
            return;
        }

        let chain = {
            let mut state = self.inner.lock_state();
            let Some(generation) = state.begin() else {
                tracing::debug!("Realtime transport already running");
                return;
            };
            tracing::info!("Starting realtime transport (generation {})", generation);
            state
                .tasks
                .spawn(Arc::clone(&self.inner).connect_websocket_or_fallback(generation))
        };

        if let Err(e) = chain.await {
            if e.is_cancelled() {
                tracing::debug!("Start cancelled by stop");
            } else {
                tracing::error!("Fallback chain panicked: {}", e);
            }
        }
    }

    /// Stops every transport and pending attempt, then publishes
    /// `disconnected`. Safe to call repeatedly; `start` may be called again.
    ///
    /// Status listeners have seen `disconnected` by the time this returns.
    /// When another thread is delivering statuses, this waits for it. Called
    /// from inside a status listener, the delivery happens after that
    /// listener returns.
    pub fn stop(&self) {
        {
            let mut state = self.inner.lock_state();
            state.halt();
            self.inner
                .publish_locked(&mut state, StatusUpdate::disconnected(None));
        }
        self.inner.flush_status();
        tracing::info!("Realtime transport stopped");
    }

    /// Current status snapshot
    pub fn status(&self) -> RealtimeStatus {
        self.inner.status()
    }

    /// Whether `start` has been called without a matching `stop`
    pub fn is_running(&self) -> bool {
        !self.inner.lock_state().stopped
    }

    /// Last cursor extracted from an event, or the initial cursor
    pub fn cursor(&self) -> Option<RealtimeCursor> {
        self.inner.lock_state().cursor.clone()
    }

    /// Registers an event listener. Listeners run in registration order,
    /// after the `on_event` callback.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.inner.listeners.add(listener)
    }

    /// Registers a status listener and immediately calls it with the current
    /// status.
    pub fn subscribe_status<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RealtimeStatus) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let registered = Arc::clone(&listener);
        let subscription = self
            .inner
            .status_listeners
            .add(move |status| registered(status));
        listener(&self.status());
        subscription
    }

    /// Registers a listener for status updates while in polling mode
    pub fn subscribe_polling<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RealtimeStatus) + Send + Sync + 'static,
    {
        self.subscribe_status(move |status| {
            if status.mode == TransportMode::Polling {
                listener(status);
            }
        })
    }

    /// Watch channel that always holds the latest status
    pub fn watch_status(&self) -> watch::Receiver<RealtimeStatus> {
        self.inner.status_tx.subscribe()
    }
}

impl<E: RealtimeEvent> Inner<E> {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.lock_state().is_current(generation)
    }

    pub(crate) fn status(&self) -> RealtimeStatus {
        self.lock_state().status.clone()
    }

    /// Applies `update` if `generation` is still current (or unconditionally
    /// for `None`) and delivers it. Returns false if the update was stale.
    pub(crate) fn transition(&self, generation: Option<u64>, update: StatusUpdate) -> bool {
        {
            let mut state = self.lock_state();
            if let Some(generation) = generation
                && !state.is_current(generation)
            {
                return false;
            }
            self.publish_locked(&mut state, update);
        }
        self.flush_status();
        true
    }

    fn publish_locked(&self, state: &mut ManagerState, update: StatusUpdate) {
        let change = state.apply(update);
        tracing::debug!(
            "Status: mode={}, connected={}, error={:?}",
            change.status.mode,
            change.status.is_connected,
            change.status.last_error
        );
        self.status_tx.send_replace(change.status.clone());
        self.status_dispatch.enqueue(change);
    }

    fn flush_status(&self) {
        self.status_dispatch
            .drain(|change| self.deliver_status(change));
    }

    fn deliver_status(&self, change: StatusChange) {
        self.status_listeners.notify(&change.status);
        if change.entered_polling
            && let Some(on_degraded) = &self.config.on_degraded_to_polling
        {
            on_degraded(&change.status);
        }
    }

    /// Parses a payload from transport `id` and emits it while that
    /// transport still owns the slot
    pub(crate) fn handle_payload(
        &self,
        id: u64,
        mode: TransportMode,
        payload: Value,
        event_type: Option<&str>,
    ) {
        if !self.lock_state().is_transport_current(id) {
            return;
        }
        match self.config.parser_for(mode).parse(payload, event_type) {
            Some(event) => self.emit_event(event),
            None => tracing::trace!("Dropping unparsed {} payload", mode),
        }
    }

    /// `on_event`, then listeners, then the cursor update
    pub(crate) fn emit_event(&self, event: E) {
        if let Some(on_event) = &self.config.on_event {
            on_event(&event);
        }
        self.listeners.notify(&event);

        if let Some(extract) = &self.config.cursor_from_event
            && let Some(cursor) = extract(&event)
        {
            self.lock_state().cursor = Some(cursor);
        }
    }

    pub(crate) async fn resolve_token(&self) -> Result<Option<String>> {
        resolve_token(self.config.token_provider.as_deref()).await
    }

    /// Streaming endpoint with the token in the query when configured
    pub(crate) fn transport_url(&self, base: &Url, token: Option<&str>) -> Url {
        let options = &self.config.options;
        with_token(
            base,
            token,
            options.include_token_in_query,
            options.token_query_param(),
        )
    }
}
