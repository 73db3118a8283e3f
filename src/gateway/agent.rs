//! Agent chat namespace.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Admission, GatewayContext, NamespaceGateway, chat};
use crate::domain::{
    ActorType, BusEvent, Channel, ConnectionHandle, Envelope, Namespace, RoomKey, events,
};
use crate::error::GatewayError;
use crate::ws::messages::{ClientAction, ConnectAuth};

/// Gateway for token-authenticated support agents.
#[derive(Debug, Clone)]
pub struct AgentGateway {
    ctx: GatewayContext,
}

impl AgentGateway {
    /// Creates the gateway.
    #[must_use]
    pub fn new(ctx: GatewayContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl NamespaceGateway for AgentGateway {
    fn namespace(&self) -> Namespace {
        Namespace::Agent
    }

    async fn on_connect(
        &self,
        handle: &ConnectionHandle,
        auth: &ConnectAuth,
    ) -> Result<Admission, GatewayError> {
        let ctx = &self.ctx;
        let token = auth
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::RejectedConnection("token is required".to_string()))?;
        let identity = ctx
            .verifier
            .verify(token)
            .await
            .ok_or_else(|| GatewayError::RejectedConnection("invalid token".to_string()))?;
        let user_id = identity.user_id;
        let organization_id = identity.organization_id.ok_or_else(|| {
            GatewayError::RejectedConnection(format!("user {user_id} has no organization"))
        })?;

        let previous = ctx
            .sessions
            .handle_for_user(user_id)
            .await
            .map_err(|e| GatewayError::RejectedConnection(e.to_string()))?;

        let user = match ctx
            .domain
            .mark_actor_online(ActorType::Agent, user_id, true)
            .await
        {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return Err(GatewayError::RejectedConnection(format!(
                    "unknown user {user_id}"
                )));
            }
            Err(e) => return Err(GatewayError::RejectedConnection(e.to_string())),
        };

        if let Err(e) = ctx
            .sessions
            .set_agent_session(handle, user_id, organization_id)
            .await
        {
            chat::rollback_connect(ctx, ActorType::Agent, handle, user_id, previous.as_ref())
                .await;
            return Err(GatewayError::RejectedConnection(e.to_string()));
        }

        ctx.hub
            .join(
                Namespace::Agent,
                RoomKey::AgentNotify(organization_id),
                handle,
            )
            .await;

        let envelope = Envelope::new(events::AGENT_CONNECTED)
            .organization(organization_id)
            .sender(handle.clone())
            .customer_flag(false)
            .with("mode", "online")
            .with("user_id", user_id)
            .with("user", user);
        ctx.bridge
            .publish(&BusEvent::new(Channel::AgentOnline, envelope)?)
            .await;

        if let Some(conversation_id) = auth.conversation_id
            && let Err(e) = ctx.conversations.agent_join(user_id, conversation_id).await
        {
            warn!(handle = %handle, conversation_id, error = %e, "connect-time conversation join failed");
        }

        info!(handle = %handle, user_id, organization_id, "agent connected");
        Ok(Admission {
            actor_id: user_id,
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
                chat::relay_typing(&self.ctx, ActorType::Agent, handle, data, false).await
            }
            ClientAction::StopTyping(data) => {
                chat::relay_typing(&self.ctx, ActorType::Agent, handle, data, true).await
            }
            ClientAction::MessageSeen(data) => {
                chat::mark_seen(&self.ctx, ActorType::Agent, handle, data).await
            }
            ClientAction::LeaveConversation(data) => self
                .ctx
                .conversations
                .agent_leave(handle, data.conversation_id)
                .await
                .map(|_| ()),
            ClientAction::Ping => Ok(()),
        }
    }

    async fn on_disconnect(&self, handle: &ConnectionHandle) {
        chat::teardown(&self.ctx, ActorType::Agent, handle).await;
        info!(handle = %handle, "agent disconnected");
    }
}
