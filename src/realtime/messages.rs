//! Realtime wire format: the named-message envelope.

use serde::{Deserialize, Serialize};

/// JSON envelope for every frame in both directions:
/// `{ "event": "chat", "data": { .. } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocketMessage {
    /// Message name; selects the subscribed handlers on the server side.
    pub event: String,
    /// Variant-specific payload.
    pub data: serde_json::Value,
}

impl SocketMessage {
    /// Builds an envelope for `event` carrying `data`.
    #[must_use]
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Builds the server error frame sent back for malformed input.
    #[must_use]
    pub fn error_frame(message: &str) -> Self {
        Self {
            event: "error".to_string(),
            data: serde_json::json!({ "message": message }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let msg = SocketMessage::new("chat", serde_json::json!({ "text": "hi" }));
        let Ok(json) = serde_json::to_string(&msg) else {
            panic!("serialization failed");
        };
        let Ok(back) = serde_json::from_str::<SocketMessage>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(msg, back);
    }

    #[test]
    fn error_frame_names_error_event() {
        let frame = SocketMessage::error_frame("malformed JSON");
        assert_eq!(frame.event, "error");
        assert_eq!(
            frame.data.get("message").and_then(|v| v.as_str()),
            Some("malformed JSON")
        );
    }
}
