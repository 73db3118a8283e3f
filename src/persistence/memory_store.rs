//! In-memory [`SharedStore`] for single-node runs and tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SharedStore;
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, String>,
    sets: HashMap<String, HashSet<String>>,
}

/// Process-local store with Redis-like semantics.
///
/// Empty sets are dropped, mirroring Redis, so an emptied room leaves no key
/// behind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live keys of either type.
    pub async fn key_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.strings.len() + inner.sets.len()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.inner.read().await.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        inner.sets.remove(key);
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        inner.strings.remove(key);
        inner.sets.remove(key);
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, GatewayError> {
        let mut inner = self.inner.write().await;
        if inner.strings.get(key).is_some_and(|v| v == expected) {
            inner.strings.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), GatewayError> {
        let mut inner = self.inner.write().await;
        if let Some(set) = inner.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                inner.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, GatewayError> {
        Ok(self
            .inner
            .read()
            .await
            .sets
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}
