use crate::types::constants::envelope;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// Turns a decoded transport payload into an application event.
///
/// `event_type` is the SSE event name; it is `None` for WebSocket frames and
/// poll items. Returning `None` silently drops the payload.
pub trait EventParser<E>: Send + Sync {
    fn parse(&self, payload: Value, event_type: Option<&str>) -> Option<E>;
}

/// Default parser: unwraps `{ "event_type": "message", "message": ... }`
/// envelopes, passes anything else through, and deserializes the result.
///
/// Only `null` is dropped before deserializing. Other falsy JSON values such
/// as `""`, `0` and `false` are kept and reach the event type, which decides
/// whether they are valid.
pub struct EnvelopeParser<E> {
    _event: PhantomData<fn() -> E>,
}

impl<E> EnvelopeParser<E> {
    pub fn new() -> Self {
        Self {
            _event: PhantomData,
        }
    }
}

impl<E> Default for EnvelopeParser<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DeserializeOwned> EventParser<E> for EnvelopeParser<E> {
    fn parse(&self, payload: Value, _event_type: Option<&str>) -> Option<E> {
        let inner = unwrap_envelope(payload);
        if inner.is_null() {
            return None;
        }

        match serde_json::from_value(inner) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!("Dropping payload that does not match the event type: {}", e);
                None
            }
        }
    }
}

/// Parser built from a payload-only closure (WebSocket frames, poll items)
pub struct PayloadFn<F>(pub F);

impl<E, F> EventParser<E> for PayloadFn<F>
where
    F: Fn(Value) -> Option<E> + Send + Sync,
{
    fn parse(&self, payload: Value, _event_type: Option<&str>) -> Option<E> {
        (self.0)(payload)
    }
}

/// Parser built from a closure that also receives the SSE event name
pub struct TypedPayloadFn<F>(pub F);

impl<E, F> EventParser<E> for TypedPayloadFn<F>
where
    F: Fn(Value, Option<&str>) -> Option<E> + Send + Sync,
{
    fn parse(&self, payload: Value, event_type: Option<&str>) -> Option<E> {
        (self.0)(payload, event_type)
    }
}

/// Returns the `message` field of a message envelope, or the payload itself
pub fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map)
            if map.get(envelope::EVENT_TYPE).and_then(Value::as_str)
                == Some(envelope::MESSAGE_EVENT)
                && map.contains_key(envelope::MESSAGE) =>
        {
            map.remove(envelope::MESSAGE).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decodes a text frame as JSON, keeping the raw string when it is not JSON
pub fn safe_json_parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Decodes a binary frame: JSON first, then UTF-8 text
pub fn decode_binary(data: &[u8]) -> Option<Value> {
    if let Ok(value) = serde_json::from_slice(data) {
        return Some(value);
    }
    std::str::from_utf8(data)
        .ok()
        .map(|text| Value::String(text.to_string()))
}
