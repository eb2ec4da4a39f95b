#![allow(dead_code)]

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::{SinkExt, Stream, StreamExt, stream};
use realtime_transport::{
    RealtimeEndpoints, RealtimeStatus, RealtimeTransportOptions, TransportMode,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Collects values handed to a listener
#[derive(Clone)]
pub struct Recorder<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sink(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let items = Arc::clone(&self.items);
        move |value| items.lock().unwrap().push(value.clone())
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

impl Recorder<RealtimeStatus> {
    pub fn modes(&self) -> Vec<(TransportMode, bool)> {
        self.snapshot()
            .into_iter()
            .map(|status| (status.mode, status.is_connected))
            .collect()
    }

    pub fn has(&self, check: impl Fn(&RealtimeStatus) -> bool) -> bool {
        self.snapshot().iter().any(check)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `check` until it holds, panicking after five seconds
pub async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A local address nothing listens on
pub fn unreachable_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn options() -> RealtimeTransportOptions {
    RealtimeTransportOptions {
        polling_interval_ms: Some(50),
        ws_connect_timeout_ms: Some(1_000),
        sse_connect_timeout_ms: Some(1_000),
        ..Default::default()
    }
}

pub fn endpoints(ws: SocketAddr, sse: SocketAddr, poll_base: &str) -> RealtimeEndpoints {
    RealtimeEndpoints::new(
        format!("ws://{}/ws", ws),
        format!("http://{}/stream", sse),
        format!("{}/poll", poll_base),
    )
}

/// How a test WebSocket server treats each connection
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum WsBehavior {
    /// Send the frames, then keep the connection open
    KeepOpen,
    /// Send the frames, then close the connection
    CloseAfterSend,
}

pub async fn spawn_ws_server(frames: Vec<Message>, behavior: WsBehavior) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_ws(listener, frames, behavior);
    addr
}

/// Starts a WebSocket server on a specific address
pub async fn spawn_ws_server_at(addr: SocketAddr, frames: Vec<Message>) {
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_ws(listener, frames, WsBehavior::KeepOpen);
}

fn serve_ws(listener: TcpListener, frames: Vec<Message>, behavior: WsBehavior) {
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frames = frames.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                for frame in frames {
                    if ws.send(frame).await.is_err() {
                        return;
                    }
                }
                if behavior == WsBehavior::CloseAfterSend {
                    let _ = ws.close(None).await;
                }
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_close() {
                        break;
                    }
                }
            });
        }
    });
}

/// Accepts TCP connections and never answers the handshake
pub async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// Serves `events` as `(event name, data)` on `/stream`, then keeps the
/// stream open
pub async fn spawn_sse_server(events: Vec<(&'static str, String)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_sse(listener, events);
    addr
}

/// Starts an SSE server on a specific address
pub async fn spawn_sse_server_at(addr: SocketAddr, events: Vec<(&'static str, String)>) {
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_sse(listener, events);
}

fn serve_sse(listener: TcpListener, events: Vec<(&'static str, String)>) {
    let app = Router::new().route(
        "/stream",
        get(move || {
            let events = events.clone();
            async move {
                let stream = event_stream(events).chain(stream::pending());
                Sse::new(stream).keep_alive(KeepAlive::default())
            }
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}

/// Serves `events` to the first client and then ends its stream. Later
/// requests are refused with 503.
pub async fn spawn_ending_sse_server(events: Vec<(&'static str, String)>) -> SocketAddr {
    let served = Arc::new(AtomicBool::new(false));
    let app = Router::new().route(
        "/stream",
        get(move || {
            let events = events.clone();
            let served = Arc::clone(&served);
            async move {
                if served.swap(true, Ordering::SeqCst) {
                    return StatusCode::SERVICE_UNAVAILABLE.into_response();
                }
                Sse::new(event_stream(events)).into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn event_stream(
    events: Vec<(&'static str, String)>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::iter(events).map(|(name, data)| Ok(Event::default().event(name).data(data)))
}

pub fn text(json: serde_json::Value) -> Message {
    Message::Text(json.to_string().into())
}
