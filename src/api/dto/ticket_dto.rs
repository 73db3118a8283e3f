//! Ticket thread and SLA alert DTOs.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::service::SlaAlert;

/// Request body for `POST /tickets/{ticket_id}/messages`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketMessageRequest {
    /// Author's e-mail address.
    pub user: String,
    /// Message text.
    pub message: String,
    /// Creation time; defaults to now.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for `POST /sla-alerts`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SlaAlertRequest {
    /// Alert text.
    pub message: String,
    /// Opaque context forwarded to clients.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
    /// Alert classification, e.g. `first_response`.
    #[serde(default)]
    pub alert_type: String,
    /// Escalation level.
    #[serde(default)]
    pub level: i64,
    /// User ids to notify.
    #[serde(default)]
    pub receivers: Vec<i64>,
}

impl From<SlaAlertRequest> for SlaAlert {
    fn from(req: SlaAlertRequest) -> Self {
        Self {
            message: req.message,
            payload: req.payload,
            alert_type: req.alert_type,
            level: req.level,
            receivers: req.receivers,
        }
    }
}
