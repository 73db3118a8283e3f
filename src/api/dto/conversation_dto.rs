//! Conversation join and membership DTOs.

use serde::Serialize;
use utoipa::ToSchema;

/// Response body for the join endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Conversation joined.
    pub conversation_id: i64,
    /// Handle that was attached to the conversation room.
    pub handle: String,
}

/// Response body for `GET /conversations/{id}/members`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MembersResponse {
    /// Conversation queried.
    pub conversation_id: i64,
    /// Attached handles, sorted.
    pub members: Vec<String>,
}
