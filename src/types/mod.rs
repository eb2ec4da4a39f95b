pub mod constants;
pub mod cursor;
pub mod error;
pub mod status;

pub use constants::*;
pub use cursor::{QueryParams, RealtimeCursor};
pub use error::{RealtimeError, Result};
pub use status::{RealtimeStatus, StatusUpdate, TransportMode};
