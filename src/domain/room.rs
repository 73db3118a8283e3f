//! Room keys used as fanout targets.

use std::fmt;

/// Named subset of handles within a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Org-wide agent notification room, `agent-notify:{org}`.
    AgentNotify(i64),
    /// Org-wide customer notification room, `customer-notify:{org}`.
    CustomerNotify(i64),
    /// One conversation, `conversation:{id}`.
    Conversation(i64),
    /// One ticket thread, `ticket:{id}`.
    Ticket(i64),
    /// Personal room of one agent, `user:{id}`.
    User(i64),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AgentNotify(org) => write!(f, "agent-notify:{org}"),
            Self::CustomerNotify(org) => write!(f, "customer-notify:{org}"),
            Self::Conversation(id) => write!(f, "conversation:{id}"),
            Self::Ticket(id) => write!(f, "ticket:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_keys_follow_conventions() {
        assert_eq!(RoomKey::AgentNotify(7).to_string(), "agent-notify:7");
        assert_eq!(RoomKey::CustomerNotify(7).to_string(), "customer-notify:7");
        assert_eq!(RoomKey::Conversation(42).to_string(), "conversation:42");
        assert_eq!(RoomKey::Ticket(3).to_string(), "ticket:3");
        assert_eq!(RoomKey::User(11).to_string(), "user:11");
    }
}
