//! Conversation room membership shared across processes.
//!
//! Keys:
//!
//! - `ws:room:conversation:{id}` → set of handles attached to the room
//! - `ws:handle:conversation:{handle}` → the handle's current conversation
//! - `ws:handle:rooms:{handle}` → every conversation the handle was added to
//!
//! The third key lets teardown purge a handle from every room it joined,
//! including agents that multi-home across several conversations.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::ConnectionHandle;
use crate::error::GatewayError;
use crate::persistence::SharedStore;

fn room_key(conversation_id: i64) -> String {
    format!("ws:room:conversation:{conversation_id}")
}

fn current_key(handle: &ConnectionHandle) -> String {
    format!("ws:handle:conversation:{handle}")
}

fn joined_key(handle: &ConnectionHandle) -> String {
    format!("ws:handle:rooms:{handle}")
}

/// Set-valued membership store for conversation rooms.
#[derive(Debug, Clone)]
pub struct RoomMembership {
    store: Arc<dyn SharedStore>,
}

impl RoomMembership {
    /// Creates a membership store over the given shared store.
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Adds `handle` to the room of `conversation_id`.
    ///
    /// Does not evict the handle from rooms it joined earlier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn add_member(
        &self,
        conversation_id: i64,
        handle: &ConnectionHandle,
    ) -> Result<(), GatewayError> {
        self.store
            .set_add(&room_key(conversation_id), handle.as_str())
            .await?;
        self.store
            .set_add(&joined_key(handle), &conversation_id.to_string())
            .await?;
        debug!(handle = %handle, conversation_id, "room member added");
        Ok(())
    }

    /// Removes `handle` from the room of `conversation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn remove_member(
        &self,
        conversation_id: i64,
        handle: &ConnectionHandle,
    ) -> Result<(), GatewayError> {
        self.store
            .set_remove(&room_key(conversation_id), handle.as_str())
            .await?;
        self.store
            .set_remove(&joined_key(handle), &conversation_id.to_string())
            .await?;
        debug!(handle = %handle, conversation_id, "room member removed");
        Ok(())
    }

    /// Returns every handle attached to the room of `conversation_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn members(
        &self,
        conversation_id: i64,
    ) -> Result<HashSet<ConnectionHandle>, GatewayError> {
        let raw = self.store.set_members(&room_key(conversation_id)).await?;
        Ok(raw.into_iter().map(ConnectionHandle::from).collect())
    }

    /// Records the conversation `handle` is currently attached to.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn set_current_conversation(
        &self,
        handle: &ConnectionHandle,
        conversation_id: i64,
    ) -> Result<(), GatewayError> {
        self.store
            .set(&current_key(handle), &conversation_id.to_string())
            .await
    }

    /// Returns the conversation `handle` is currently attached to.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn current_conversation(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<Option<i64>, GatewayError> {
        let raw = self.store.get(&current_key(handle)).await?;
        Ok(raw.and_then(|value| match value.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(handle = %handle, value = %value, "ignoring non-numeric current conversation");
                None
            }
        }))
    }

    /// Forgets the current conversation of `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn clear_current_conversation(
        &self,
        handle: &ConnectionHandle,
    ) -> Result<(), GatewayError> {
        self.store.delete(&current_key(handle)).await
    }

    /// Removes `handle` from every room it joined and drops its reverse
    /// entries. Returns the conversations it was removed from.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    pub async fn purge_handle(&self, handle: &ConnectionHandle) -> Result<Vec<i64>, GatewayError> {
        let mut conversations: Vec<i64> = self
            .store
            .set_members(&joined_key(handle))
            .await?
            .iter()
            .filter_map(|raw| raw.parse().ok())
            .collect();
        if let Some(current) = self.current_conversation(handle).await?
            && !conversations.contains(&current)
        {
            conversations.push(current);
        }

        for conversation_id in &conversations {
            self.store
                .set_remove(&room_key(*conversation_id), handle.as_str())
                .await?;
        }
        self.store.delete(&joined_key(handle)).await?;
        self.store.delete(&current_key(handle)).await?;

        conversations.sort_unstable();
        debug!(handle = %handle, rooms = conversations.len(), "handle purged from rooms");
        Ok(conversations)
    }
}
