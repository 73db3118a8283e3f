//! Redis-backed [`SharedStore`].

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::SharedStore;
use crate::error::GatewayError;

/// Deletes KEYS[1] only while it still equals ARGV[1].
const COMPARE_AND_DELETE: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Shared store over a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    compare_and_delete: redis::Script,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if the initial
    /// connection cannot be established.
    pub async fn connect(client: redis::Client) -> Result<Self, GatewayError> {
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            compare_and_delete: redis::Script::new(COMPARE_AND_DELETE),
        })
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let mut conn = self.manager.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, GatewayError> {
        let mut conn = self.manager.clone();
        let removed: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), GatewayError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.sadd(key, member).await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), GatewayError> {
        let mut conn = self.manager.clone();
        let _: i64 = conn.srem(key, member).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, GatewayError> {
        let mut conn = self.manager.clone();
        let members: HashSet<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
