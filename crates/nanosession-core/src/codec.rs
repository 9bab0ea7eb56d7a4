//! Record codec: session payload <-> stored bytes.
//!
//! Payloads are plain JSON objects. Only the JSON data model is ever
//! reconstructed on decode, so a tampered record can at worst yield
//! unexpected data, never behaviour.

use serde_json::{Map, Value};

use crate::error::SessionError;

/// Session payload: string keys to JSON values.
pub type Payload = Map<String, Value>;

/// Serialize a payload for storage.
pub fn encode(payload: &Payload) -> Result<Vec<u8>, SessionError> {
    serde_json::to_vec(payload).map_err(|e| SessionError::CorruptRecord(e.to_string()))
}

/// Deserialize stored bytes back into a payload.
///
/// Anything that is not a UTF-8 JSON object is `CorruptRecord`.
pub fn decode(bytes: &[u8]) -> Result<Payload, SessionError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SessionError::CorruptRecord(format!(
            "expected an object, found {}",
            kind(&other)
        ))),
        Err(e) => Err(SessionError::CorruptRecord(e.to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
