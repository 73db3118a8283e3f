//! Broadcast policy: which rooms of which namespaces receive an event.
//!
//! [`route`] is a pure function of the event. It never looks at who is
//! connected; the dispatcher applies the resulting [`Delivery`] list to the
//! local hub.
//!
//! | Channel                          | Targets                                                   |
//! |----------------------------------|-----------------------------------------------------------|
//! | agent online/offline             | `agent-notify` (minus sender), `customer-notify`          |
//! | customer online/offline          | `agent-notify`                                            |
//! | message, typing, typing-stop     | customer: `agent-notify`; agent: customer `conversation` (minus sender) + `agent-notify` |
//! | message-seen                     | customer: `agent-notify`; agent: customer `conversation` (minus sender) |
//! | unresolved, joins, leaves        | `agent-notify`                                            |
//! | ticket-message                   | ticket `ticket:{id}` (minus sender)                       |
//! | ticket-sla-alert                 | ticket-sla `user:{id}` per receiver                       |

use crate::domain::{BusEvent, ConnectionHandle, Namespace, RoomKey};

/// One emit the dispatcher must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Namespace to emit in.
    pub namespace: Namespace,
    /// Room within the namespace.
    pub room: RoomKey,
    /// Handle that must not receive the emit.
    pub exclude: Option<ConnectionHandle>,
}

impl Delivery {
    fn to(namespace: Namespace, room: RoomKey) -> Self {
        Self {
            namespace,
            room,
            exclude: None,
        }
    }

    fn excluding(mut self, handle: Option<&ConnectionHandle>) -> Self {
        self.exclude = handle.cloned();
        self
    }
}

/// Decides the fanout targets of `event`.
#[must_use]
pub fn route(event: &BusEvent) -> Vec<Delivery> {
    let envelope = event.envelope();
    let org = envelope.organization_id;
    let conversation = envelope.conversation_id;
    let sender = event.sender();

    let agent_notify = || {
        org.map(|id| Delivery::to(Namespace::Agent, RoomKey::AgentNotify(id)))
    };
    let customer_room = || {
        conversation
            .map(|id| Delivery::to(Namespace::Customer, RoomKey::Conversation(id)).excluding(sender))
    };

    match event {
        BusEvent::AgentOnline(_) | BusEvent::AgentOffline(_) => [
            agent_notify().map(|d| d.excluding(sender)),
            org.map(|id| Delivery::to(Namespace::Customer, RoomKey::CustomerNotify(id))),
        ]
        .into_iter()
        .flatten()
        .collect(),

        BusEvent::CustomerOnline(_)
        | BusEvent::CustomerOffline(_)
        | BusEvent::ConversationUnresolved(_)
        | BusEvent::CustomerJoinConversation(_)
        | BusEvent::AgentJoinConversation(_)
        | BusEvent::CustomerLeaveConversation(_)
        | BusEvent::AgentLeaveConversation(_) => agent_notify().into_iter().collect(),

        BusEvent::Message(_) | BusEvent::Typing(_) | BusEvent::TypingStop(_) => {
            if event.is_customer() {
                agent_notify().into_iter().collect()
            } else {
                [customer_room(), agent_notify()].into_iter().flatten().collect()
            }
        }

        BusEvent::MessageSeen(_) => {
            if event.is_customer() {
                agent_notify().into_iter().collect()
            } else {
                customer_room().into_iter().collect()
            }
        }

        BusEvent::TicketMessage(e) => e
            .payload_i64("ticket_id")
            .map(|id| Delivery::to(Namespace::Ticket, RoomKey::Ticket(id)).excluding(sender))
            .into_iter()
            .collect(),

        BusEvent::TicketSlaAlert(e) => {
            let has_message = e
                .payload
                .get("message")
                .and_then(serde_json::Value::as_str)
                .is_some_and(|m| !m.is_empty());
            if !has_message {
                return Vec::new();
            }
            event
                .receivers()
                .into_iter()
                .map(|uid| Delivery::to(Namespace::TicketSla, RoomKey::User(uid)))
                .collect()
        }
    }
}
