//! Customer chat namespace.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Admission, GatewayContext, NamespaceGateway, chat};
use crate::domain::{
    ActorType, BusEvent, Channel, ConnectionHandle, Envelope, Namespace, RoomKey, events,
};
use crate::error::GatewayError;
use crate::ws::messages::{ClientAction, ConnectAuth};

/// Gateway for anonymous website customers.
///
/// Customers are identified by a previously issued `customer_id` and the
/// `organization_id` of the site they are on; no token is involved.
#[derive(Debug, Clone)]
pub struct CustomerGateway {
    ctx: GatewayContext,
}

impl CustomerGateway {
    /// Creates the gateway.
    #[must_use]
    pub fn new(ctx: GatewayContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl NamespaceGateway for CustomerGateway {
    fn namespace(&self) -> Namespace {
        Namespace::Customer
    }

    async fn on_connect(
        &self,
        handle: &ConnectionHandle,
        auth: &ConnectAuth,
    ) -> Result<Admission, GatewayError> {
        let ctx = &self.ctx;
        let customer_id = auth
            .customer_id
            .ok_or_else(|| GatewayError::RejectedConnection("customer_id is required".to_string()))?;
        let organization_id = auth.organization_id.ok_or_else(|| {
            GatewayError::RejectedConnection("organization_id is required".to_string())
        })?;

        let previous = ctx
            .sessions
            .handle_for_customer(customer_id)
            .await
            .map_err(|e| GatewayError::RejectedConnection(e.to_string()))?;

        let customer = match ctx
            .domain
            .mark_actor_online(ActorType::Customer, customer_id, true)
            .await
        {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return Err(GatewayError::RejectedConnection(format!(
                    "unknown customer {customer_id}"
                )));
            }
            Err(e) => return Err(GatewayError::RejectedConnection(e.to_string())),
        };

        if let Err(e) = ctx
            .sessions
            .set_customer_session(handle, customer_id, organization_id)
            .await
        {
            chat::rollback_connect(
                ctx,
                ActorType::Customer,
                handle,
                customer_id,
                previous.as_ref(),
            )
            .await;
            return Err(GatewayError::RejectedConnection(e.to_string()));
        }

        ctx.hub
            .join(
                Namespace::Customer,
                RoomKey::CustomerNotify(organization_id),
                handle,
            )
            .await;

        let envelope = Envelope::new(events::CUSTOMER_LAND)
            .organization(organization_id)
            .sender(handle.clone())
            .customer_flag(true)
            .with("mode", "online")
            .with("customer_id", customer_id)
            .with("customer", customer);
        ctx.bridge
            .publish(&BusEvent::new(Channel::CustomerOnline, envelope)?)
            .await;

        if let Some(conversation_id) = auth.conversation_id
            && let Err(e) = ctx
                .conversations
                .customer_join(customer_id, conversation_id)
                .await
        {
            warn!(handle = %handle, conversation_id, error = %e, "connect-time conversation join failed");
        }

        info!(handle = %handle, customer_id, organization_id, "customer connected");
        Ok(Admission {
            actor_id: customer_id,
            organization_id: Some(organization_id),
        })
    }

    async fn on_action(
        &self,
        handle: &ConnectionHandle,
        action: ClientAction,
    ) -> Result<(), GatewayError> {
        match action {
            ClientAction::Typing(data) => {
                chat::relay_typing(&self.ctx, ActorType::Customer, handle, data, false).await
            }
            ClientAction::StopTyping(data) => {
                chat::relay_typing(&self.ctx, ActorType::Customer, handle, data, true).await
            }
            ClientAction::MessageSeen(data) => {
                chat::mark_seen(&self.ctx, ActorType::Customer, handle, data).await
            }
            ClientAction::LeaveConversation(_) => {
                self.ctx.conversations.customer_leave(handle).await.map(|_| ())
            }
            ClientAction::Ping => Ok(()),
        }
    }

    async fn on_disconnect(&self, handle: &ConnectionHandle) {
        chat::teardown(&self.ctx, ActorType::Customer, handle).await;
        info!(handle = %handle, "customer disconnected");
    }
}
