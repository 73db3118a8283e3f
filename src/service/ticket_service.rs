//! Ticket thread broadcasts and SLA alerts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::bus::EventBridge;
use crate::domain::{BusEvent, Channel, Envelope, events};
use crate::error::GatewayError;

/// Publishes ticket-namespace events.
#[derive(Debug, Clone)]
pub struct TicketService {
    bridge: Arc<EventBridge>,
}

/// An SLA alert addressed to a set of agents.
#[derive(Debug, Clone, PartialEq)]
pub struct SlaAlert {
    /// Human-readable alert text.
    pub message: String,
    /// Opaque context forwarded to clients.
    pub payload: Value,
    /// Alert classification.
    pub alert_type: String,
    /// Escalation level.
    pub level: i64,
    /// User ids to notify.
    pub receivers: Vec<i64>,
}

impl TicketService {
    /// Creates the service.
    #[must_use]
    pub fn new(bridge: Arc<EventBridge>) -> Self {
        Self { bridge }
    }

    /// Broadcasts a ticket thread message to everyone watching the ticket.
    ///
    /// Returns `false` without publishing when the author or message is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the publish fails.
    pub async fn broadcast_message(
        &self,
        ticket_id: i64,
        user_email: &str,
        message: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        if user_email.is_empty() || message.is_empty() {
            return Ok(false);
        }
        let envelope = Envelope::new(events::TICKET_BROADCAST)
            .with("ticket_id", ticket_id)
            .with("user", user_email)
            .with("message", message)
            .with("created_at", created_at.to_rfc3339());
        self.bridge
            .try_publish(&BusEvent::new(Channel::TicketMessage, envelope)?)
            .await?;
        tracing::info!(ticket_id, user = %user_email, "ticket message broadcast");
        Ok(true)
    }

    /// Sends an SLA alert to each receiver's personal room.
    ///
    /// Returns `false` without publishing when there are no receivers or
    /// the message is empty.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the publish fails.
    pub async fn send_sla_alert(&self, alert: SlaAlert) -> Result<bool, GatewayError> {
        if alert.receivers.is_empty() || alert.message.is_empty() {
            return Ok(false);
        }
        let receivers = alert.receivers.len();
        let envelope = Envelope::new(events::TICKET_SLA_ALERT)
            .with("message", alert.message)
            .with("payload", alert.payload)
            .with("alert_type", alert.alert_type)
            .with("level", alert.level)
            .with("receivers", alert.receivers);
        self.bridge
            .try_publish(&BusEvent::new(Channel::TicketSlaAlert, envelope)?)
            .await?;
        tracing::info!(receivers, "sla alert published");
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::bus::{MemoryBus, MessageBus};

    fn service() -> (TicketService, Arc<MemoryBus>) {
        let bus = Arc::new(MemoryBus::new(16));
        let shared: Arc<dyn MessageBus> = Arc::clone(&bus) as Arc<dyn MessageBus>;
        (TicketService::new(Arc::new(EventBridge::new(shared))), bus)
    }

    #[tokio::test]
    async fn empty_message_is_not_published() {
        let (tickets, bus) = service();
        let Ok(mut sub) = bus.subscribe().await else {
            panic!("subscribe failed");
        };
        assert_eq!(
            tickets.broadcast_message(3, "a@x.io", "", Utc::now()).await.ok(),
            Some(false)
        );
        let alert = SlaAlert {
            message: "late".to_string(),
            payload: json!({}),
            alert_type: "first_response".to_string(),
            level: 1,
            receivers: Vec::new(),
        };
        assert_eq!(tickets.send_sla_alert(alert).await.ok(), Some(false));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), sub.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn ticket_message_carries_thread_fields() {
        let (tickets, bus) = service();
        let Ok(mut sub) = bus.subscribe().await else {
            panic!("subscribe failed");
        };
        let Ok(true) = tickets
            .broadcast_message(3, "a@x.io", "hello", Utc::now())
            .await
        else {
            panic!("expected publish");
        };
        let Some(raw) = sub.next().await else {
            panic!("nothing published");
        };
        assert_eq!(raw.channel, Channel::TicketMessage);
        let Ok(event) = BusEvent::from_wire(raw.channel, &raw.payload) else {
            panic!("published envelope must validate");
        };
        assert_eq!(event.envelope().payload_i64("ticket_id"), Some(3));
        assert_eq!(event.envelope().payload.get("user"), Some(&json!("a@x.io")));
    }
}
