//! # Realtime Transport
//!
//! Keeps a stream of server events flowing over whichever transport the
//! network allows: WebSocket first, Server-Sent Events next, HTTP polling
//! last. While degraded to polling the manager periodically probes the
//! faster transports and switches back as soon as one opens.
//!
//! ## Example
//!
//! ```no_run
//! use realtime_transport::{RealtimeEndpoints, RealtimeTransportManager, RealtimeTransportOptions};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct ChatMessage {
//!     id: String,
//!     body: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = RealtimeTransportManager::<ChatMessage>::new(
//!         RealtimeEndpoints::new(
//!             "wss://api.example.com/v1/chat/ws",
//!             "https://api.example.com/v1/chat/stream",
//!             "https://api.example.com/v1/chat/messages",
//!         ),
//!         RealtimeTransportOptions::default(),
//!     )?;
//!
//!     let _events = manager.subscribe(|message| println!("{}: {}", message.id, message.body));
//!     let _status = manager.subscribe_status(|status| println!("transport: {}", status.mode));
//!
//!     manager.start().await;
//!     tokio::signal::ctrl_c().await?;
//!     manager.stop();
//!     Ok(())
//! }
//! ```

pub mod infrastructure;
pub mod manager;
pub mod messaging;
pub mod transport;
pub mod types;

pub use infrastructure::{PollFetcher, PollRequest, PollResponse, ReqwestFetcher, StaticToken, TokenProvider};
pub use manager::{
    RealtimeEndpoints, RealtimeEvent, RealtimeTransportBuilder, RealtimeTransportManager,
    RealtimeTransportOptions,
};
pub use messaging::{EnvelopeParser, EventParser, PayloadFn, Subscription, TypedPayloadFn};
pub use types::{
    QueryParams, RealtimeCursor, RealtimeError, RealtimeStatus, Result, StatusUpdate,
    TransportMode,
};
