//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// Response body for endpoints that hand an event to the bus (202 Accepted).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublishedResponse {
    /// `false` when the request was a no-op (e.g. empty message).
    pub published: bool,
    /// Bus channel the event went to.
    pub channel: String,
}
