//! Ticket thread and ticket SLA namespaces.
//!
//! Both authenticate agents by token but keep no registry entry: the chat
//! namespace owns the agent's handle mapping, and these connections are only
//! fanout targets for ticket events.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Admission, GatewayContext, NamespaceGateway};
use crate::domain::{ConnectionHandle, Identity, Namespace, RoomKey};
use crate::error::GatewayError;
use crate::ws::messages::{ClientAction, ConnectAuth};

async fn authenticate(ctx: &GatewayContext, auth: &ConnectAuth) -> Result<Identity, GatewayError> {
    let token = auth
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GatewayError::RejectedConnection("token is required".to_string()))?;
    ctx.verifier
        .verify(token)
        .await
        .ok_or_else(|| GatewayError::RejectedConnection("invalid token".to_string()))
}

fn unsupported(namespace: Namespace, action: &ClientAction) -> Result<(), GatewayError> {
    match action {
        ClientAction::Ping => Ok(()),
        other => Err(GatewayError::InvalidRequest(format!(
            "{} is not supported on the {namespace} namespace",
            other.name()
        ))),
    }
}

/// Gateway for agents watching a single ticket thread.
#[derive(Debug, Clone)]
pub struct TicketGateway {
    ctx: GatewayContext,
}

impl TicketGateway {
    /// Creates the gateway.
    #[must_use]
    pub fn new(ctx: GatewayContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl NamespaceGateway for TicketGateway {
    fn namespace(&self) -> Namespace {
        Namespace::Ticket
    }

    async fn on_connect(
        &self,
        handle: &ConnectionHandle,
        auth: &ConnectAuth,
    ) -> Result<Admission, GatewayError> {
        let identity = authenticate(&self.ctx, auth).await?;
        match auth.ticket_id {
            Some(ticket_id) => {
                self.ctx
                    .hub
                    .join(Namespace::Ticket, RoomKey::Ticket(ticket_id), handle)
                    .await;
                info!(
                    handle = %handle,
                    user_id = identity.user_id,
                    email = identity.email.as_deref().unwrap_or_default(),
                    ticket_id,
                    "agent watching ticket"
                );
            }
            None => debug!(handle = %handle, "ticket connection without ticket_id"),
        }
        Ok(Admission {
            actor_id: identity.user_id,
            organization_id: identity.organization_id,
        })
    }

    async fn on_action(
        &self,
        _handle: &ConnectionHandle,
        action: ClientAction,
    ) -> Result<(), GatewayError> {
        unsupported(Namespace::Ticket, &action)
    }

    async fn on_disconnect(&self, handle: &ConnectionHandle) {
        debug!(handle = %handle, "ticket connection closed");
    }
}

/// Gateway for agents receiving SLA alerts in their personal room.
#[derive(Debug, Clone)]
pub struct SlaGateway {
    ctx: GatewayContext,
}

impl SlaGateway {
    /// Creates the gateway.
    #[must_use]
    pub fn new(ctx: GatewayContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl NamespaceGateway for SlaGateway {
    fn namespace(&self) -> Namespace {
        Namespace::TicketSla
    }

    async fn on_connect(
        &self,
        handle: &ConnectionHandle,
        auth: &ConnectAuth,
    ) -> Result<Admission, GatewayError> {
        let identity = authenticate(&self.ctx, auth).await?;
        self.ctx
            .hub
            .join(Namespace::TicketSla, RoomKey::User(identity.user_id), handle)
            .await;
        info!(handle = %handle, user_id = identity.user_id, "agent subscribed to sla alerts");
        Ok(Admission {
            actor_id: identity.user_id,
            organization_id: identity.organization_id,
        })
    }

    async fn on_action(
        &self,
        _handle: &ConnectionHandle,
        action: ClientAction,
    ) -> Result<(), GatewayError> {
        unsupported(Namespace::TicketSla, &action)
    }

    async fn on_disconnect(&self, handle: &ConnectionHandle) {
        debug!(handle = %handle, "sla connection closed");
    }
}
