//! Bridge response shapes: tolerant JSON decoding and poll message extraction.

use serde::Serialize;
use serde_json::{Map, Value};

/// A decoded response body. Always an object, whatever the bridge sent.
pub type Payload = Map<String, Value>;

/// One message picked up by poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResult {
    /// Extracted message text.
    pub text: String,
    /// The bridge's `messages` value, passed through as-is (null when absent).
    pub messages: Option<Value>,
    /// Full decoded body, for fields not modeled here.
    pub raw: Payload,
}

/// Decode a response body into an object without ever failing.
///
/// - blank body => `{}`
/// - JSON object => itself
/// - any other JSON value => `{"data": value}`
/// - invalid JSON => `{"text": body}`
pub fn safe_json(body: &str) -> Payload {
    if body.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
        Err(_) => {
            let mut map = Map::new();
            map.insert("text".to_string(), Value::String(body.to_string()));
            map
        }
    }
}

/// Null, false, zero and empty strings/arrays/objects count as "nothing there".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Find the message in a poll payload: `message` first, else the `content` of the
/// last entry in `messages`.
pub fn extract_message(payload: &Payload) -> Option<&Value> {
    payload
        .get("message")
        .filter(|m| is_truthy(m))
        .or_else(|| {
            payload
                .get("messages")?
                .as_array()?
                .last()?
                .as_object()?
                .get("content")
                .filter(|c| is_truthy(c))
        })
}

/// Normalize a decoded poll payload. `None` means no message this cycle.
pub fn poll_result(payload: Payload) -> Option<PollResult> {
    let text = match extract_message(&payload)? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let messages = payload.get("messages").filter(|m| !m.is_null()).cloned();
    Some(PollResult {
        text,
        messages,
        raw: payload,
    })
}
