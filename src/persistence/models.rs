//! Snapshots returned by domain collaborators.
//!
//! The gateway treats snapshot JSON opaquely; only the ids it needs for
//! routing are lifted into typed fields.

use serde_json::Value;

/// A chat message resolved by id.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    /// Message id.
    pub id: i64,
    /// Conversation the message belongs to.
    pub conversation_id: i64,
    /// Full row as JSON.
    pub snapshot: Value,
}

/// A conversation resolved by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRecord {
    /// Conversation id.
    pub id: i64,
    /// Owning organization.
    pub organization_id: i64,
    /// Customer the conversation belongs to.
    pub customer_id: Option<i64>,
    /// Full row as JSON.
    pub snapshot: Value,
}
