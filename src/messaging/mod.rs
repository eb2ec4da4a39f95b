// Messaging module - payload parsing and listener fan-out
pub mod dispatch;
pub mod parser;
pub mod registry;

pub use dispatch::OrderedDispatch;
pub use parser::{
    EnvelopeParser, EventParser, PayloadFn, TypedPayloadFn, decode_binary, safe_json_parse,
    unwrap_envelope,
};
pub use registry::{ListenerRegistry, Subscription};
