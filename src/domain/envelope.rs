//! Bus envelopes: one validated variant per channel.
//!
//! An [`Envelope`] carries the routing metadata every consumer needs
//! (`organization_id`, `conversation_id`, `sid`, `is_customer`) as typed
//! fields and keeps every other payload key verbatim in a flattened map, so
//! collaborator snapshots pass through the bridge untouched. A [`BusEvent`]
//! pairs an envelope with its channel and is only constructed after the
//! channel's required routing fields have been checked.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Channel, ConnectionHandle};
use crate::error::GatewayError;

/// Client-facing event names carried in [`Envelope::event`].
pub mod events {
    /// Message created.
    pub const RECEIVE_MESSAGE: &str = "receive_message";
    /// Message edited.
    pub const EDIT_MESSAGE: &str = "edit_message";
    /// Typing indicator.
    pub const RECEIVE_TYPING: &str = "receive_typing";
    /// Typing stopped.
    pub const STOP_TYPING: &str = "stop_typing";
    /// Message marked seen.
    pub const MESSAGE_SEEN: &str = "message_seen";
    /// Customer landed on the website.
    pub const CUSTOMER_LAND: &str = "customer_land";
    /// Customer disconnected.
    pub const CUSTOMER_DISCONNECTED: &str = "customer_disconnected";
    /// Agent connected.
    pub const AGENT_CONNECTED: &str = "agent_connected";
    /// Agent disconnected.
    pub const AGENT_DISCONNECTED: &str = "agent_disconnected";
    /// Customer joined a conversation.
    pub const CUSTOMER_CONVERSATION_JOIN: &str = "customer_conversation_join";
    /// Agent joined a conversation.
    pub const AGENT_CONVERSATION_JOIN: &str = "agent_conversation_join";
    /// Customer left its conversation.
    pub const CUSTOMER_CONVERSATION_LEAVE: &str = "customer_conversation_leave";
    /// Agent left a conversation.
    pub const AGENT_CONVERSATION_LEAVE: &str = "agent_conversation_leave";
    /// Resolved conversation re-opened.
    pub const UNRESOLVE_CONVERSATION: &str = "unresolve_conversation";
    /// Ticket thread message.
    pub const TICKET_BROADCAST: &str = "ticket_broadcast";
    /// Ticket SLA alert.
    pub const TICKET_SLA_ALERT: &str = "ticket_sla_alert";
}

/// Structured event published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name delivered to clients.
    pub event: String,

    /// Owning organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,

    /// Conversation the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,

    /// Handle of the connection that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<ConnectionHandle>,

    /// Whether the originating actor is a customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_customer: Option<bool>,

    /// Every other payload key, forwarded opaquely.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Creates an envelope with only the event name set.
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            organization_id: None,
            conversation_id: None,
            sid: None,
            is_customer: None,
            payload: Map::new(),
        }
    }

    /// Sets the organization.
    #[must_use]
    pub fn organization(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Sets the conversation.
    #[must_use]
    pub fn conversation(mut self, conversation_id: i64) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Sets the originating handle.
    #[must_use]
    pub fn sender(mut self, handle: ConnectionHandle) -> Self {
        self.sid = Some(handle);
        self
    }

    /// Sets the customer flag.
    #[must_use]
    pub fn customer_flag(mut self, is_customer: bool) -> Self {
        self.is_customer = Some(is_customer);
        self
    }

    /// Adds an opaque payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Returns an integer payload field.
    #[must_use]
    pub fn payload_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }

    /// Serializes the whole envelope as the map delivered to clients.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// An envelope validated against its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    /// See [`Channel::AgentOnline`].
    AgentOnline(Envelope),
    /// See [`Channel::AgentOffline`].
    AgentOffline(Envelope),
    /// See [`Channel::CustomerOnline`].
    CustomerOnline(Envelope),
    /// See [`Channel::CustomerOffline`].
    CustomerOffline(Envelope),
    /// See [`Channel::Message`].
    Message(Envelope),
    /// See [`Channel::Typing`].
    Typing(Envelope),
    /// See [`Channel::TypingStop`].
    TypingStop(Envelope),
    /// See [`Channel::MessageSeen`].
    MessageSeen(Envelope),
    /// See [`Channel::ConversationUnresolved`].
    ConversationUnresolved(Envelope),
    /// See [`Channel::CustomerJoinConversation`].
    CustomerJoinConversation(Envelope),
    /// See [`Channel::AgentJoinConversation`].
    AgentJoinConversation(Envelope),
    /// See [`Channel::CustomerLeaveConversation`].
    CustomerLeaveConversation(Envelope),
    /// See [`Channel::AgentLeaveConversation`].
    AgentLeaveConversation(Envelope),
    /// See [`Channel::TicketMessage`].
    TicketMessage(Envelope),
    /// See [`Channel::TicketSlaAlert`].
    TicketSlaAlert(Envelope),
}

impl BusEvent {
    /// Validates `envelope` for `channel` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedEnvelope`] when a routing field the
    /// channel needs is missing.
    pub fn new(channel: Channel, envelope: Envelope) -> Result<Self, GatewayError> {
        let missing = |field: &str| {
            GatewayError::MalformedEnvelope(format!("{channel} requires {field}"))
        };
        let need_org = |e: &Envelope| {
            e.organization_id
                .map(|_| ())
                .ok_or_else(|| missing("organization_id"))
        };
        let need_conversation = |e: &Envelope| {
            e.conversation_id
                .map(|_| ())
                .ok_or_else(|| missing("conversation_id"))
        };

        let event = match channel {
            Channel::AgentOnline => {
                need_org(&envelope)?;
                Self::AgentOnline(envelope)
            }
            Channel::AgentOffline => {
                need_org(&envelope)?;
                Self::AgentOffline(envelope)
            }
            Channel::CustomerOnline => {
                need_org(&envelope)?;
                Self::CustomerOnline(envelope)
            }
            Channel::CustomerOffline => {
                need_org(&envelope)?;
                Self::CustomerOffline(envelope)
            }
            Channel::Message => {
                need_org(&envelope)?;
                need_conversation(&envelope)?;
                Self::Message(envelope)
            }
            Channel::Typing => {
                need_org(&envelope)?;
                need_conversation(&envelope)?;
                Self::Typing(envelope)
            }
            Channel::TypingStop => {
                need_org(&envelope)?;
                need_conversation(&envelope)?;
                Self::TypingStop(envelope)
            }
            Channel::MessageSeen => {
                need_org(&envelope)?;
                need_conversation(&envelope)?;
                Self::MessageSeen(envelope)
            }
            Channel::ConversationUnresolved => {
                need_org(&envelope)?;
                Self::ConversationUnresolved(envelope)
            }
            Channel::CustomerJoinConversation => {
                need_org(&envelope)?;
                need_conversation(&envelope)?;
                Self::CustomerJoinConversation(envelope)
            }
            Channel::AgentJoinConversation => {
                need_org(&envelope)?;
                need_conversation(&envelope)?;
                Self::AgentJoinConversation(envelope)
            }
            Channel::CustomerLeaveConversation => {
                need_conversation(&envelope)?;
                Self::CustomerLeaveConversation(envelope)
            }
            Channel::AgentLeaveConversation => {
                need_conversation(&envelope)?;
                Self::AgentLeaveConversation(envelope)
            }
            Channel::TicketMessage => {
                envelope
                    .payload_i64("ticket_id")
                    .ok_or_else(|| missing("ticket_id"))?;
                Self::TicketMessage(envelope)
            }
            Channel::TicketSlaAlert => {
                let receivers_ok = envelope
                    .payload
                    .get("receivers")
                    .and_then(Value::as_array)
                    .is_some_and(|list| list.iter().all(Value::is_i64));
                if !receivers_ok {
                    return Err(missing("receivers as an integer array"));
                }
                Self::TicketSlaAlert(envelope)
            }
        };
        Ok(event)
    }

    /// Decodes and validates a raw bus payload.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedEnvelope`] if the payload is not an
    /// envelope object or fails channel validation.
    pub fn from_wire(channel: Channel, payload: &str) -> Result<Self, GatewayError> {
        let envelope: Envelope = serde_json::from_str(payload)
            .map_err(|e| GatewayError::MalformedEnvelope(format!("{channel}: {e}")))?;
        Self::new(channel, envelope)
    }

    /// Serializes the envelope for publishing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if serialization fails.
    pub fn to_wire(&self) -> Result<String, GatewayError> {
        serde_json::to_string(self.envelope()).map_err(|e| GatewayError::Internal(e.to_string()))
    }

    /// Returns the channel this event travels on.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::AgentOnline(_) => Channel::AgentOnline,
            Self::AgentOffline(_) => Channel::AgentOffline,
            Self::CustomerOnline(_) => Channel::CustomerOnline,
            Self::CustomerOffline(_) => Channel::CustomerOffline,
            Self::Message(_) => Channel::Message,
            Self::Typing(_) => Channel::Typing,
            Self::TypingStop(_) => Channel::TypingStop,
            Self::MessageSeen(_) => Channel::MessageSeen,
            Self::ConversationUnresolved(_) => Channel::ConversationUnresolved,
            Self::CustomerJoinConversation(_) => Channel::CustomerJoinConversation,
            Self::AgentJoinConversation(_) => Channel::AgentJoinConversation,
            Self::CustomerLeaveConversation(_) => Channel::CustomerLeaveConversation,
            Self::AgentLeaveConversation(_) => Channel::AgentLeaveConversation,
            Self::TicketMessage(_) => Channel::TicketMessage,
            Self::TicketSlaAlert(_) => Channel::TicketSlaAlert,
        }
    }

    /// Returns the wrapped envelope.
    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        match self {
            Self::AgentOnline(e)
            | Self::AgentOffline(e)
            | Self::CustomerOnline(e)
            | Self::CustomerOffline(e)
            | Self::Message(e)
            | Self::Typing(e)
            | Self::TypingStop(e)
            | Self::MessageSeen(e)
            | Self::ConversationUnresolved(e)
            | Self::CustomerJoinConversation(e)
            | Self::AgentJoinConversation(e)
            | Self::CustomerLeaveConversation(e)
            | Self::AgentLeaveConversation(e)
            | Self::TicketMessage(e)
            | Self::TicketSlaAlert(e) => e,
        }
    }

    /// Whether the originating actor is a customer (absent means agent).
    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.envelope().is_customer.unwrap_or(false)
    }

    /// Handle of the originating connection, if recorded.
    #[must_use]
    pub fn sender(&self) -> Option<&ConnectionHandle> {
        self.envelope().sid.as_ref()
    }

    /// Receivers of an SLA alert; empty for every other variant.
    #[must_use]
    pub fn receivers(&self) -> Vec<i64> {
        match self {
            Self::TicketSlaAlert(e) => e
                .payload
                .get("receivers")
                .and_then(Value::as_array)
                .map(|list| list.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_without_conversation_is_rejected() {
        let envelope = Envelope::new(events::RECEIVE_MESSAGE).organization(7);
        let Err(err) = BusEvent::new(Channel::Message, envelope) else {
            panic!("expected validation failure");
        };
        assert!(err.to_string().contains("conversation_id"));
    }

    #[test]
    fn presence_requires_organization() {
        let envelope = Envelope::new(events::AGENT_CONNECTED).with("user_id", 1);
        assert!(BusEvent::new(Channel::AgentOnline, envelope).is_err());
    }

    #[test]
    fn wire_round_trip_preserves_unknown_fields() {
        let raw = json!({
            "event": "receive_message",
            "organization_id": 7,
            "conversation_id": 42,
            "sid": "h-1",
            "is_customer": false,
            "content": "hello",
            "attachments": [{"url": "https://x/y.png"}],
            "user": {"id": 1, "name": "Ada"},
            "reply_to": null
        });
        let Ok(event) = BusEvent::from_wire(Channel::Message, &raw.to_string()) else {
            panic!("valid envelope");
        };
        let Ok(wire) = event.to_wire() else {
            panic!("serializable");
        };
        let Ok(back) = serde_json::from_str::<Value>(&wire) else {
            panic!("json");
        };
        assert_eq!(back, raw);
    }

    #[test]
    fn garbage_payload_is_malformed() {
        let result = BusEvent::from_wire(Channel::Typing, "not json");
        assert!(matches!(result, Err(GatewayError::MalformedEnvelope(_))));
    }

    #[test]
    fn sla_alert_requires_integer_receivers() {
        let bad = Envelope::new(events::TICKET_SLA_ALERT).with("receivers", json!(["a"]));
        assert!(BusEvent::new(Channel::TicketSlaAlert, bad).is_err());

        let good = Envelope::new(events::TICKET_SLA_ALERT).with("receivers", json!([3, 4]));
        let Ok(event) = BusEvent::new(Channel::TicketSlaAlert, good) else {
            panic!("valid alert");
        };
        assert_eq!(event.receivers(), vec![3, 4]);
    }

    #[test]
    fn missing_customer_flag_means_agent() {
        let envelope = Envelope::new(events::RECEIVE_TYPING)
            .organization(1)
            .conversation(2);
        let Ok(event) = BusEvent::new(Channel::Typing, envelope) else {
            panic!("valid");
        };
        assert!(!event.is_customer());
        assert_eq!(event.channel(), Channel::Typing);
    }
}
