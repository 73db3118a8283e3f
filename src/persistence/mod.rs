//! Persistence layer: the shared session store and domain lookups.
//!
//! [`SharedStore`] is the only cross-process mutable state the gateway
//! touches. Every operation is a single idempotent key/value or set command;
//! there are no multi-key transactions. Two implementations exist: Redis
//! for real deployments and an in-memory map for single-node runs and tests.
//! [`postgres::PostgresDomain`] answers the read/update lookups gateways
//! delegate to the business database.

pub mod memory_store;
pub mod models;
pub mod postgres;
pub mod redis_store;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::GatewayError;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

/// Cross-process key/value and set store.
#[async_trait]
pub trait SharedStore: Send + Sync + std::fmt::Debug {
    /// Reads a string key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError>;

    /// Writes a string key, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn set(&self, key: &str, value: &str) -> Result<(), GatewayError>;

    /// Deletes a key of any type. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn delete(&self, key: &str) -> Result<(), GatewayError>;

    /// Deletes a string key only if it still holds `expected`.
    ///
    /// Returns `true` when the key was removed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, GatewayError>;

    /// Adds `member` to the set at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn set_add(&self, key: &str, member: &str) -> Result<(), GatewayError>;

    /// Removes `member` from the set at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), GatewayError>;

    /// Returns every member of the set at `key` (empty if absent).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn set_members(&self, key: &str) -> Result<HashSet<String>, GatewayError>;

    /// Round-trips a trivial command to check reachability.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the store is down.
    async fn ping(&self) -> Result<(), GatewayError>;
}
