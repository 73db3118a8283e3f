//! PostgreSQL implementation of the domain collaborator contract.
//!
//! Reads and flips presence flags on the business tables owned by the main
//! application. Rows come back as `to_jsonb` snapshots that the gateway
//! forwards to clients unchanged.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{ConversationRecord, MessageRecord};
use crate::config::GatewayConfig;
use crate::domain::ActorType;
use crate::error::GatewayError;
use crate::service::DomainStore;

/// PostgreSQL-backed domain lookups using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresDomain {
    pool: PgPool,
}

impl PostgresDomain {
    /// Creates a new domain adapter with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds a connection pool from configuration and connects.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Domain`] if the database is unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl DomainStore for PostgresDomain {
    async fn mark_actor_online(
        &self,
        actor: ActorType,
        id: i64,
        online: bool,
    ) -> Result<Option<Value>, GatewayError> {
        let sql = match actor {
            ActorType::Agent => {
                "UPDATE users SET is_online = $2 WHERE id = $1 \
                 RETURNING to_jsonb(users) - 'password'"
            }
            ActorType::Customer => {
                "UPDATE customers SET is_online = $2 WHERE id = $1 \
                 RETURNING to_jsonb(customers)"
            }
        };
        let snapshot = sqlx::query_scalar::<_, Value>(sql)
            .bind(id)
            .bind(online)
            .fetch_optional(&self.pool)
            .await?;
        Ok(snapshot)
    }

    async fn resolve_message(&self, id: i64) -> Result<Option<MessageRecord>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, i64, Value)>(
            "SELECT m.id::bigint, m.conversation_id::bigint, to_jsonb(m) \
             FROM messages m WHERE m.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, conversation_id, snapshot)| MessageRecord {
            id,
            conversation_id,
            snapshot,
        }))
    }

    async fn mark_message_seen(&self, id: i64) -> Result<Option<MessageRecord>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, i64, Value)>(
            "UPDATE messages SET seen = TRUE WHERE id = $1 \
             RETURNING id::bigint, conversation_id::bigint, to_jsonb(messages)",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, conversation_id, snapshot)| MessageRecord {
            id,
            conversation_id,
            snapshot,
        }))
    }

    async fn resolve_conversation(
        &self,
        id: i64,
    ) -> Result<Option<ConversationRecord>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, i64, Option<i64>, Value)>(
            "SELECT c.id::bigint, c.organization_id::bigint, c.customer_id::bigint, to_jsonb(c) \
             FROM conversations c WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(
            row.map(|(id, organization_id, customer_id, snapshot)| ConversationRecord {
                id,
                organization_id,
                customer_id,
                snapshot,
            }),
        )
    }

    async fn resolve_customer(&self, id: i64) -> Result<Option<Value>, GatewayError> {
        let snapshot =
            sqlx::query_scalar::<_, Value>("SELECT to_jsonb(c) FROM customers c WHERE c.id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(snapshot)
    }

    async fn resolve_user(&self, id: i64) -> Result<Option<Value>, GatewayError> {
        let snapshot = sqlx::query_scalar::<_, Value>(
            "SELECT to_jsonb(u) - 'password' FROM users u WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(snapshot)
    }
}
