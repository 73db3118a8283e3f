//! WebSocket message types: server frames, client actions, connect auth.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Top-level server → client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    /// Server-generated frame id.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: Value,
}

/// Discriminator for server frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Reply to the connection itself (`connected`, `pong`).
    Response,
    /// Fanned-out bus event.
    Event,
    /// Rejection or protocol error.
    Error,
}

impl WsMessage {
    fn build(msg_type: WsMessageType, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// A fanned-out event: `payload = {"event": name, "data": data}`.
    #[must_use]
    pub fn event(name: &str, data: Value) -> Self {
        Self::build(WsMessageType::Event, json!({ "event": name, "data": data }))
    }

    /// A response frame named `name`.
    #[must_use]
    pub fn response(name: &str, data: Value) -> Self {
        Self::build(WsMessageType::Response, json!({ "event": name, "data": data }))
    }

    /// An error frame.
    #[must_use]
    pub fn error(name: &str, code: u32, message: &str) -> Self {
        Self::build(
            WsMessageType::Error,
            json!({ "event": name, "data": { "code": code, "message": message } }),
        )
    }

    /// Serializes the frame to JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Actions a client may send: `{"event": <name>, "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientAction {
    /// Typing indicator.
    Typing(TypingData),
    /// Typing stopped.
    StopTyping(TypingData),
    /// A message was read.
    MessageSeen(SeenData),
    /// Leave a conversation room.
    LeaveConversation(LeaveData),
    /// Keep-alive; answered with `pong`.
    Ping,
}

impl ClientAction {
    /// Action name as sent by the client.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop_typing",
            Self::MessageSeen(_) => "message_seen",
            Self::LeaveConversation(_) => "leave_conversation",
            Self::Ping => "ping",
        }
    }
}

/// Payload of `typing` / `stop_typing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TypingData {
    /// Conversation being typed in.
    pub conversation_id: Option<i64>,
    /// Owning organization.
    pub organization_id: Option<i64>,
    /// Draft text preview.
    pub message: Option<String>,
    /// Indicator mode, `typing` when absent.
    pub mode: Option<String>,
}

/// Payload of `message_seen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeenData {
    /// Message that was read.
    pub message_id: Option<i64>,
    /// Owning organization; falls back to the session's.
    pub organization_id: Option<i64>,
}

/// Payload of `leave_conversation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeaveData {
    /// Conversation to leave. Required for agents, ignored for customers.
    pub conversation_id: Option<i64>,
}

/// Connect-time identification, taken from the upgrade query string.
#[derive(Clone, Default, Deserialize)]
pub struct ConnectAuth {
    /// Agent token.
    pub token: Option<String>,
    /// Customer id (customer namespace).
    pub customer_id: Option<i64>,
    /// Organization id (customer namespace).
    pub organization_id: Option<i64>,
    /// Conversation to join immediately.
    pub conversation_id: Option<i64>,
    /// Ticket thread to watch (ticket namespace).
    pub ticket_id: Option<i64>,
}

impl fmt::Debug for ConnectAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectAuth")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("customer_id", &self.customer_id)
            .field("organization_id", &self.organization_id)
            .field("conversation_id", &self.conversation_id)
            .field("ticket_id", &self.ticket_id)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_typing_action() {
        let text = r#"{"event":"typing","data":{"conversation_id":42,"organization_id":7,"message":"he"}}"#;
        let Ok(ClientAction::Typing(data)) = serde_json::from_str::<ClientAction>(text) else {
            panic!("expected typing");
        };
        assert_eq!(data.conversation_id, Some(42));
        assert_eq!(data.mode, None);
    }

    #[test]
    fn ping_needs_no_data() {
        let Ok(action) = serde_json::from_str::<ClientAction>(r#"{"event":"ping"}"#) else {
            panic!("expected ping");
        };
        assert_eq!(action, ClientAction::Ping);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ClientAction>(r#"{"event":"explode","data":{}}"#).is_err());
    }

    #[test]
    fn event_frame_shape() {
        let frame = WsMessage::event("receive_message", json!({"conversation_id": 42}));
        let Ok(value) = serde_json::to_value(&frame) else {
            panic!("serialize failed");
        };
        assert_eq!(value["type"], "event");
        assert_eq!(value["payload"]["event"], "receive_message");
        assert_eq!(value["payload"]["data"]["conversation_id"], 42);
    }

    #[test]
    fn debug_redacts_token() {
        let auth = ConnectAuth {
            token: Some("secret".to_string()),
            ..ConnectAuth::default()
        };
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
