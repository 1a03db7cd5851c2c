use serde::{Deserialize, Serialize};

use crate::AppResult;

/// Events this client sends to the room broadcaster.
///
/// On the wire every event is `{"event": <name>, "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    Join {
        name: String,
        room_code: String,
        user_id: String,
    },
    SendMessage {
        name: String,
        room_code: String,
        message: String,
        user_id: String,
    },
    Leave {
        name: String,
        room_code: String,
        user_id: String,
    },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Join { .. } => "join",
            OutboundEvent::SendMessage { .. } => "send_message",
            OutboundEvent::Leave { .. } => "leave",
        }
    }
}

/// Payload of an inbound `message` event and of each history item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub name: String,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(WireMessage),
    /// The transport is gone, whether or not this side asked for it.
    Disconnected,
}

#[derive(Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

pub fn encode_event(event: &OutboundEvent) -> AppResult<String> {
    Ok(serde_json::to_string(event)?)
}

/// `Ok(None)` for well-formed frames carrying events this client has no use for.
pub fn decode_frame(text: &str) -> AppResult<Option<WireMessage>> {
    let frame: Frame = serde_json::from_str(text)?;
    if frame.event != "message" {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(frame.data)?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn send_message_envelope() {
        let event = OutboundEvent::SendMessage {
            name: "Alice".into(),
            room_code: "AB12CD".into(),
            message: "hi".into(),
            user_id: "user_1".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&encode_event(&event).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "send_message",
                "data": {"name": "Alice", "room_code": "AB12CD", "message": "hi", "user_id": "user_1"},
            })
        );
        assert_eq!(event.name(), "send_message");
    }

    #[test]
    fn decode_system_notice_without_timestamp() {
        let msg = decode_frame(r#"{"event":"message","data":{"name":"System","msg":"Bob joined the room"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(msg.name, "System");
        assert_eq!(msg.timestamp, None);
    }

    #[test]
    fn decode_ignores_other_events() {
        assert_eq!(decode_frame(r#"{"event":"typing","data":{"name":"Bob"}}"#).unwrap(), None);
        assert_eq!(decode_frame(r#"{"event":"ping"}"#).unwrap(), None);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"{"event":"message","data":{"msg":"no name"}}"#).is_err());
    }
}
