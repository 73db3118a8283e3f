//! Session records and verified identities.

use serde::{Deserialize, Serialize};

use super::{ActorType, ConnectionHandle};

/// One authenticated actor occupying one connection handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Connection the actor occupies.
    pub handle: ConnectionHandle,
    /// Agent or customer.
    pub actor_type: ActorType,
    /// User id (agents) or customer id (customers).
    pub actor_id: i64,
    /// Organization the actor belongs to.
    pub organization_id: i64,
}

/// Identity resolved from an agent token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User id.
    pub user_id: i64,
    /// Organization the user acts for, if any.
    pub organization_id: Option<i64>,
    /// E-mail address, when the token carries one.
    pub email: Option<String>,
}
