// Manager module - public entry point, fallback chain and shared state
pub mod builder;
mod core;
mod fallback;
mod state;

pub use builder::{RealtimeEndpoints, RealtimeTransportBuilder, RealtimeTransportOptions};
pub use self::core::{RealtimeEvent, RealtimeTransportManager};

pub(crate) use self::core::Inner;
