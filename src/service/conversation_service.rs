//! Conversation room joins and leaves for customers and agents.
//!
//! [`ConversationService`] coordinates the session registry, the shared
//! membership store, the local hub and the bus:
//!
//! - a join resolves the actor's live handle, validates the entities,
//!   attaches the handle locally (if owned here), records membership and
//!   publishes the join event so the owning process attaches it too;
//! - a leave detaches, drops membership and publishes the leave event.
//!
//! Customers hold one current conversation, tracked in the reverse index.
//! Agents may sit in several and always name the one they leave.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use super::DomainStore;
use crate::bus::EventBridge;
use crate::domain::{
    BusEvent, Channel, ConnectionHandle, Envelope, Namespace, RoomKey, RoomMembership,
    SessionRegistry, events,
};
use crate::error::GatewayError;
use crate::ws::hub::ConnectionHub;

/// Join/leave orchestration for conversation rooms.
#[derive(Debug, Clone)]
pub struct ConversationService {
    sessions: SessionRegistry,
    rooms: RoomMembership,
    hub: Arc<ConnectionHub>,
    bridge: Arc<EventBridge>,
    domain: Arc<dyn DomainStore>,
}

impl ConversationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        sessions: SessionRegistry,
        rooms: RoomMembership,
        hub: Arc<ConnectionHub>,
        bridge: Arc<EventBridge>,
        domain: Arc<dyn DomainStore>,
    ) -> Self {
        Self {
            sessions,
            rooms,
            hub,
            bridge,
            domain,
        }
    }

    /// Attaches customer `customer_id`'s live connection to a conversation.
    ///
    /// Returns the handle that joined.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NotFound`] if the customer has no live connection
    ///   or the customer/conversation does not exist.
    /// - [`GatewayError::RegistryUnavailable`] / [`GatewayError::Domain`]
    ///   on backend failure.
    pub async fn customer_join(
        &self,
        customer_id: i64,
        conversation_id: i64,
    ) -> Result<ConnectionHandle, GatewayError> {
        let handle = self
            .sessions
            .handle_for_customer(customer_id)
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("no live connection for customer {customer_id}"))
            })?;

        let conversation = self
            .domain
            .resolve_conversation(conversation_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("conversation {conversation_id}")))?;
        let customer = self
            .domain
            .resolve_customer(customer_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("customer {customer_id}")))?;

        self.hub
            .join(
                Namespace::Customer,
                RoomKey::Conversation(conversation_id),
                &handle,
            )
            .await;
        self.rooms.add_member(conversation_id, &handle).await?;
        self.rooms
            .set_current_conversation(&handle, conversation_id)
            .await?;

        let mut snapshot = conversation.snapshot;
        if let Value::Object(map) = &mut snapshot {
            map.insert("customer".to_string(), customer);
        }
        let envelope = Envelope::new(events::CUSTOMER_CONVERSATION_JOIN)
            .organization(conversation.organization_id)
            .conversation(conversation_id)
            .sender(handle.clone())
            .customer_flag(true)
            .with("customer_id", customer_id)
            .with("conversation", snapshot);
        self.bridge
            .publish(&BusEvent::new(Channel::CustomerJoinConversation, envelope)?)
            .await;

        tracing::info!(handle = %handle, customer_id, conversation_id, "customer joined conversation");
        Ok(handle)
    }

    /// Attaches agent `user_id`'s live connection to a conversation.
    ///
    /// No current-conversation entry is written: agents multi-home.
    ///
    /// # Errors
    ///
    /// Same as [`Self::customer_join`].
    pub async fn agent_join(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<ConnectionHandle, GatewayError> {
        let handle = self
            .sessions
            .handle_for_user(user_id)
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("no live connection for user {user_id}"))
            })?;

        let user = self
            .domain
            .resolve_user(user_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("user {user_id}")))?;
        let conversation = self
            .domain
            .resolve_conversation(conversation_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("conversation {conversation_id}")))?;

        self.hub
            .join(Namespace::Agent, RoomKey::Conversation(conversation_id), &handle)
            .await;
        self.rooms.add_member(conversation_id, &handle).await?;

        let envelope = Envelope::new(events::AGENT_CONVERSATION_JOIN)
            .organization(conversation.organization_id)
            .conversation(conversation_id)
            .sender(handle.clone())
            .customer_flag(false)
            .with("user_id", user_id)
            .with("user", user);
        self.bridge
            .publish(&BusEvent::new(Channel::AgentJoinConversation, envelope)?)
            .await;

        tracing::info!(handle = %handle, user_id, conversation_id, "agent joined conversation");
        Ok(handle)
    }

    /// Detaches a customer from its current conversation.
    ///
    /// Returns the conversation left.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::StaleOperation`] if the handle has no current
    ///   conversation.
    /// - [`GatewayError::RegistryUnavailable`] on store failure.
    pub async fn customer_leave(&self, handle: &ConnectionHandle) -> Result<i64, GatewayError> {
        let conversation_id = self
            .rooms
            .current_conversation(handle)
            .await?
            .ok_or_else(|| GatewayError::StaleOperation(format!("{handle} is in no conversation")))?;

        self.hub
            .leave(
                Namespace::Customer,
                RoomKey::Conversation(conversation_id),
                handle,
            )
            .await;
        self.rooms.remove_member(conversation_id, handle).await?;
        self.rooms.clear_current_conversation(handle).await?;

        let session = self.sessions.session(handle).await?;
        let mut envelope = Envelope::new(events::CUSTOMER_CONVERSATION_LEAVE)
            .conversation(conversation_id)
            .sender(handle.clone())
            .customer_flag(true);
        if let Some(session) = session {
            envelope = envelope
                .organization(session.organization_id)
                .with("customer_id", session.actor_id);
        }
        self.bridge
            .publish(&BusEvent::new(Channel::CustomerLeaveConversation, envelope)?)
            .await;

        tracing::info!(handle = %handle, conversation_id, "customer left conversation");
        Ok(conversation_id)
    }

    /// Detaches an agent from the named conversation.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::StaleOperation`] if no conversation is named.
    /// - [`GatewayError::RegistryUnavailable`] on store failure.
    pub async fn agent_leave(
        &self,
        handle: &ConnectionHandle,
        conversation_id: Option<i64>,
    ) -> Result<i64, GatewayError> {
        let conversation_id = conversation_id.ok_or_else(|| {
            GatewayError::StaleOperation("agent leave without conversation_id".to_string())
        })?;

        self.hub
            .leave(Namespace::Agent, RoomKey::Conversation(conversation_id), handle)
            .await;
        self.rooms.remove_member(conversation_id, handle).await?;

        let session = self.sessions.session(handle).await?;
        let mut envelope = Envelope::new(events::AGENT_CONVERSATION_LEAVE)
            .conversation(conversation_id)
            .sender(handle.clone())
            .customer_flag(false);
        if let Some(session) = session {
            envelope = envelope
                .organization(session.organization_id)
                .with("user_id", session.actor_id);
        }
        self.bridge
            .publish(&BusEvent::new(Channel::AgentLeaveConversation, envelope)?)
            .await;

        tracing::info!(handle = %handle, conversation_id, "agent left conversation");
        Ok(conversation_id)
    }

    /// Handles currently attached to a conversation, across all processes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] on store failure.
    pub async fn members(
        &self,
        conversation_id: i64,
    ) -> Result<HashSet<ConnectionHandle>, GatewayError> {
        self.rooms.members(conversation_id).await
    }
}
