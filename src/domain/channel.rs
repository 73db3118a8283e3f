//! Fixed bus channel taxonomy.
//!
//! Every envelope travels on exactly one [`Channel`]. The wire name is the
//! configured prefix followed by [`Channel::as_str`], e.g. `chat-message`.

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// Named bus channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// An agent connected.
    AgentOnline,
    /// An agent disconnected.
    AgentOffline,
    /// A customer landed on the website (connected).
    CustomerOnline,
    /// A customer disconnected.
    CustomerOffline,
    /// A message was created or edited.
    Message,
    /// Someone started typing.
    Typing,
    /// Someone stopped typing.
    TypingStop,
    /// A message was marked seen.
    MessageSeen,
    /// A customer re-opened a resolved conversation.
    ConversationUnresolved,
    /// A customer entered a conversation room.
    CustomerJoinConversation,
    /// An agent entered a conversation room.
    AgentJoinConversation,
    /// A customer left its conversation room.
    CustomerLeaveConversation,
    /// An agent left a conversation room.
    AgentLeaveConversation,
    /// A message was posted on a ticket thread.
    TicketMessage,
    /// A ticket SLA alert targeting specific agents.
    TicketSlaAlert,
}

impl Channel {
    /// Every channel; a process subscribes to all of them.
    pub const ALL: [Self; 15] = [
        Self::AgentOnline,
        Self::AgentOffline,
        Self::CustomerOnline,
        Self::CustomerOffline,
        Self::Message,
        Self::Typing,
        Self::TypingStop,
        Self::MessageSeen,
        Self::ConversationUnresolved,
        Self::CustomerJoinConversation,
        Self::AgentJoinConversation,
        Self::CustomerLeaveConversation,
        Self::AgentLeaveConversation,
        Self::TicketMessage,
        Self::TicketSlaAlert,
    ];

    /// Returns the unprefixed channel name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentOnline => "agent-online",
            Self::AgentOffline => "agent-offline",
            Self::CustomerOnline => "customer-online",
            Self::CustomerOffline => "customer-offline",
            Self::Message => "message",
            Self::Typing => "typing",
            Self::TypingStop => "typing-stop",
            Self::MessageSeen => "message-seen",
            Self::ConversationUnresolved => "conversation-unresolved",
            Self::CustomerJoinConversation => "customer-join-conversation",
            Self::AgentJoinConversation => "agent-join-conversation",
            Self::CustomerLeaveConversation => "customer-leave-conversation",
            Self::AgentLeaveConversation => "agent-leave-conversation",
            Self::TicketMessage => "ticket-message",
            Self::TicketSlaAlert => "ticket-sla-alert",
        }
    }

    /// Returns the on-the-wire channel name for the given prefix.
    #[must_use]
    pub fn wire_name(self, prefix: &str) -> String {
        format!("{prefix}{}", self.as_str())
    }

    /// Resolves a wire channel name by stripping `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownChannel`] if the name lacks the prefix
    /// or names no channel in the taxonomy.
    pub fn from_wire(name: &str, prefix: &str) -> Result<Self, GatewayError> {
        name.strip_prefix(prefix)
            .ok_or_else(|| GatewayError::UnknownChannel(name.to_string()))?
            .parse()
    }
}

impl FromStr for Channel {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GatewayError::UnknownChannel(s.to_string()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_channel_parses_back_from_its_name() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().ok(), Some(channel));
        }
    }

    #[test]
    fn wire_names_carry_prefix() {
        assert_eq!(Channel::TypingStop.wire_name("chat-"), "chat-typing-stop");
        assert_eq!(
            Channel::from_wire("chat-message-seen", "chat-").ok(),
            Some(Channel::MessageSeen)
        );
    }

    #[test]
    fn foreign_prefix_is_unknown() {
        assert!(Channel::from_wire("other-message", "chat-").is_err());
        assert!(Channel::from_wire("chat-bogus", "chat-").is_err());
    }
}
