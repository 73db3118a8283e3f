//! Cross-process mapping between connection handles and actors.
//!
//! [`SessionRegistry`] keeps both directions in the [`SharedStore`]:
//!
//! - `ws:session:{handle}` → JSON [`Session`]
//! - `ws:agent:user:{user_id}` → handle
//! - `ws:customer:id:{customer_id}` → handle
//!
//! Writes are plain overwrites, so a reconnect replaces the previous handle
//! (latest wins). Teardown removes the actor → handle entry only while it
//! still names the departing handle.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{ActorType, ConnectionHandle, Session};
use crate::error::GatewayError;
use crate::persistence::SharedStore;

fn session_key(handle: &ConnectionHandle) -> String {
    format!("ws:session:{handle}")
}

fn actor_key(actor_type: ActorType, actor_id: i64) -> String {
    match actor_type {
        ActorType::Agent => format!("ws:agent:user:{actor_id}"),
        ActorType::Customer => format!("ws:customer:id:{actor_id}"),
    }
}

/// Bidirectional handle ↔ actor registry over a shared store.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SharedStore>,
}

impl SessionRegistry {
    /// Creates a registry over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Records an agent session for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn set_agent_session(
        &self,
        handle: &ConnectionHandle,
        user_id: i64,
        organization_id: i64,
    ) -> Result<(), GatewayError> {
        self.put(Session {
            handle: handle.clone(),
            actor_type: ActorType::Agent,
            actor_id: user_id,
            organization_id,
        })
        .await
    }

    /// Records a customer session for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn set_customer_session(
        &self,
        handle: &ConnectionHandle,
        customer_id: i64,
        organization_id: i64,
    ) -> Result<(), GatewayError> {
        self.put(Session {
            handle: handle.clone(),
            actor_type: ActorType::Customer,
            actor_id: customer_id,
            organization_id,
        })
        .await
    }

    async fn put(&self, session: Session) -> Result<(), GatewayError> {
        let encoded =
            serde_json::to_string(&session).map_err(|e| GatewayError::Internal(e.to_string()))?;
        self.store
            .set(&session_key(&session.handle), &encoded)
            .await?;
        self.store
            .set(
                &actor_key(session.actor_type, session.actor_id),
                session.handle.as_str(),
            )
            .await?;
        debug!(
            handle = %session.handle,
            actor_type = %session.actor_type,
            actor_id = session.actor_id,
            organization_id = session.organization_id,
            "session registered"
        );
        Ok(())
    }

    /// Returns the handle currently occupied by an actor.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn handle_for_actor(
        &self,
        actor_type: ActorType,
        actor_id: i64,
    ) -> Result<Option<ConnectionHandle>, GatewayError> {
        let value = self.store.get(&actor_key(actor_type, actor_id)).await?;
        Ok(value.map(ConnectionHandle::from))
    }

    /// Returns the handle currently occupied by agent `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn handle_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<ConnectionHandle>, GatewayError> {
        self.handle_for_actor(ActorType::Agent, user_id).await
    }

    /// Returns the handle currently occupied by customer `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn handle_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Option<ConnectionHandle>, GatewayError> {
        self.handle_for_actor(ActorType::Customer, customer_id).await
    }

    /// Returns the agent user id behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn user_for_handle(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<Option<i64>, GatewayError> {
        Ok(self
            .session(handle)
            .await?
            .filter(|s| s.actor_type == ActorType::Agent)
            .map(|s| s.actor_id))
    }

    /// Returns the customer id behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn customer_for_handle(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<Option<i64>, GatewayError> {
        Ok(self
            .session(handle)
            .await?
            .filter(|s| s.actor_type == ActorType::Customer)
            .map(|s| s.actor_id))
    }

    /// Returns the full session record for `handle`.
    ///
    /// An undecodable record is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn session(&self, handle: &ConnectionHandle) -> Result<Option<Session>, GatewayError> {
        let Some(raw) = self.store.get(&session_key(handle)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(handle = %handle, error = %e, "discarding undecodable session record");
                Ok(None)
            }
        }
    }

    /// Removes both directions of the session held by `handle`.
    ///
    /// Returns the removed session, if there was one. The actor → handle
    /// entry survives when a newer connection has already overwritten it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn clear_session(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<Option<Session>, GatewayError> {
        let session = self.session(handle).await?;
        self.store.delete(&session_key(handle)).await?;

        if let Some(session) = &session {
            let removed = self
                .store
                .delete_if_equals(
                    &actor_key(session.actor_type, session.actor_id),
                    handle.as_str(),
                )
                .await?;
            if !removed {
                debug!(
                    handle = %handle,
                    actor_id = session.actor_id,
                    "actor mapping already owned by a newer handle"
                );
            }
        }
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn registry() -> (SessionRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn SharedStore> = Arc::clone(&store) as Arc<dyn SharedStore>;
        (SessionRegistry::new(shared), store)
    }

    #[tokio::test]
    async fn agent_session_resolves_both_directions() {
        let (registry, _) = registry();
        let handle = ConnectionHandle::from("h-agent");
        let Ok(()) = registry.set_agent_session(&handle, 11, 7).await else {
            panic!("write failed");
        };

        let Ok(user) = registry.user_for_handle(&handle).await else {
            panic!("lookup failed");
        };
        assert_eq!(user, Some(11));
        let Ok(found) = registry.handle_for_user(11).await else {
            panic!("lookup failed");
        };
        assert_eq!(found, Some(handle.clone()));

        let Ok(customer) = registry.customer_for_handle(&handle).await else {
            panic!("lookup failed");
        };
        assert_eq!(customer, None);
    }

    #[tokio::test]
    async fn clear_session_removes_everything() {
        let (registry, store) = registry();
        let handle = ConnectionHandle::from("h-customer");
        let _ = registry.set_customer_session(&handle, 9, 7).await;

        let Ok(Some(session)) = registry.clear_session(&handle).await else {
            panic!("expected a session to clear");
        };
        assert_eq!(session.actor_id, 9);
        assert_eq!(registry.customer_for_handle(&handle).await.ok(), Some(None));
        assert_eq!(registry.handle_for_customer(9).await.ok(), Some(None));
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn reconnect_wins_over_stale_teardown() {
        let (registry, _) = registry();
        let old = ConnectionHandle::from("old");
        let new = ConnectionHandle::from("new");
        let _ = registry.set_agent_session(&old, 11, 7).await;
        let _ = registry.set_agent_session(&new, 11, 7).await;

        let _ = registry.clear_session(&old).await;

        assert_eq!(registry.handle_for_user(11).await.ok(), Some(Some(new.clone())));
        assert_eq!(registry.user_for_handle(&new).await.ok(), Some(Some(11)));
        assert_eq!(registry.user_for_handle(&old).await.ok(), Some(None));
    }

    #[tokio::test]
    async fn clearing_unknown_handle_is_harmless() {
        let (registry, _) = registry();
        let Ok(session) = registry.clear_session(&ConnectionHandle::from("ghost")).await else {
            panic!("clear failed");
        };
        assert!(session.is_none());
    }
}
