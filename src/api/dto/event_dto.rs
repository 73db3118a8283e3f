//! Envelope DTO for the bus publish endpoint.

use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::domain::{ConnectionHandle, Envelope};

/// Request body for `POST /api/v1/events/{channel}`.
///
/// Routing fields are typed; every other key is forwarded to clients
/// verbatim.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishEventRequest {
    /// Event name delivered to clients, e.g. `receive_message`.
    pub event: String,
    /// Owning organization.
    #[serde(default)]
    pub organization_id: Option<i64>,
    /// Conversation the event belongs to.
    #[serde(default)]
    pub conversation_id: Option<i64>,
    /// Handle to exclude from fanout.
    #[serde(default)]
    pub sid: Option<String>,
    /// Whether the originating actor is a customer.
    #[serde(default)]
    pub is_customer: Option<bool>,
    /// Opaque payload fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl From<PublishEventRequest> for Envelope {
    fn from(req: PublishEventRequest) -> Self {
        Self {
            event: req.event,
            organization_id: req.organization_id,
            conversation_id: req.conversation_id,
            sid: req.sid.map(ConnectionHandle::from),
            is_customer: req.is_customer,
            payload: req.payload,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_land_in_payload() {
        let Ok(req) = serde_json::from_str::<PublishEventRequest>(
            r#"{"event":"receive_message","organization_id":7,"conversation_id":42,
                "is_customer":true,"message":{"id":1,"body":"hi"}}"#,
        ) else {
            panic!("request should decode");
        };
        let envelope = Envelope::from(req);
        assert_eq!(envelope.organization_id, Some(7));
        assert_eq!(envelope.is_customer, Some(true));
        assert!(envelope.sid.is_none());
        assert_eq!(envelope.payload.get("message").and_then(|m| m.get("body")), Some(&Value::from("hi")));
    }
}
