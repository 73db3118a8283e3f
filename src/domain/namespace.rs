//! Connection namespaces and actor classes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical partition of connection handles.
///
/// Routing never crosses namespaces except through the broadcast policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    /// Support agents (token-authenticated).
    Agent,
    /// Anonymous website customers.
    Customer,
    /// Agents watching a single ticket thread.
    Ticket,
    /// Agents receiving ticket SLA alerts.
    TicketSla,
}

impl Namespace {
    /// Every namespace, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Agent, Self::Customer, Self::Ticket, Self::TicketSla];

    /// Returns the namespace name as used in routes and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Customer => "customer",
            Self::Ticket => "ticket",
            Self::TicketSla => "ticket-sla",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of actor occupying a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// A support agent (organization user).
    Agent,
    /// A customer / website visitor.
    Customer,
}

impl ActorType {
    /// Returns the actor class as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Customer => "customer",
        }
    }

    /// Returns `true` for [`ActorType::Customer`].
    #[must_use]
    pub const fn is_customer(self) -> bool {
        matches!(self, Self::Customer)
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_names_are_kebab_case() {
        assert_eq!(Namespace::TicketSla.as_str(), "ticket-sla");
        assert_eq!(Namespace::Agent.to_string(), "agent");
    }

    #[test]
    fn only_customer_is_customer() {
        assert!(ActorType::Customer.is_customer());
        assert!(!ActorType::Agent.is_customer());
    }
}
