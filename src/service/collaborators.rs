//! Contracts of the external collaborators the gateway depends on.
//!
//! Both are black boxes: token issuance and the business database belong
//! to other services. Gateways only consume "verify token → identity" and
//! a handful of lookups/updates that return opaque JSON snapshots.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ActorType, Identity};
use crate::error::GatewayError;
use crate::persistence::models::{ConversationRecord, MessageRecord};

/// Resolves an agent token to an identity.
#[async_trait]
pub trait TokenVerifier: Send + Sync + std::fmt::Debug {
    /// Returns the identity behind `token`, or `None` if the token is
    /// invalid or expired.
    async fn verify(&self, token: &str) -> Option<Identity>;
}

/// Business-database operations gateways delegate to.
#[async_trait]
pub trait DomainStore: Send + Sync + std::fmt::Debug {
    /// Flags an agent or customer online/offline and returns its snapshot,
    /// or `None` if the actor does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Domain`] on database failure.
    async fn mark_actor_online(
        &self,
        actor: ActorType,
        id: i64,
        online: bool,
    ) -> Result<Option<Value>, GatewayError>;

    /// Looks up a message.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Domain`] on database failure.
    async fn resolve_message(&self, id: i64) -> Result<Option<MessageRecord>, GatewayError>;

    /// Marks a message seen and returns the updated row.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Domain`] on database failure.
    async fn mark_message_seen(&self, id: i64) -> Result<Option<MessageRecord>, GatewayError>;

    /// Looks up a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Domain`] on database failure.
    async fn resolve_conversation(
        &self,
        id: i64,
    ) -> Result<Option<ConversationRecord>, GatewayError>;

    /// Looks up a customer snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Domain`] on database failure.
    async fn resolve_customer(&self, id: i64) -> Result<Option<Value>, GatewayError>;

    /// Looks up an agent (user) snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Domain`] on database failure.
    async fn resolve_user(&self, id: i64) -> Result<Option<Value>, GatewayError>;
}
