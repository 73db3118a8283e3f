//! Redis PUBLISH/SUBSCRIBE transport.
//!
//! Channel names on Redis are the configured prefix followed by the channel
//! name, e.g. `chat-message`. Messages on unknown channels or with non-UTF-8
//! payloads are logged and skipped.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{MessageBus, RawEnvelope};
use crate::domain::Channel;
use crate::error::GatewayError;

/// Bus over Redis pub/sub.
///
/// Publishing shares the multiplexed [`ConnectionManager`]; every
/// subscription opens its own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
    prefix: String,
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisBus {
    /// Connects the publishing side.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RegistryUnavailable`] if Redis cannot be
    /// reached.
    pub async fn connect(
        client: redis::Client,
        prefix: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let publisher = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            publisher,
            prefix: prefix.into(),
        })
    }
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish(&self, channel: Channel, payload: String) -> Result<(), GatewayError> {
        let mut conn = self.publisher.clone();
        let _: i64 = conn
            .publish(channel.wire_name(&self.prefix), payload)
            .await
            .map_err(|e| GatewayError::Bus(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, RawEnvelope>, GatewayError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| GatewayError::Bus(e.to_string()))?;

        let names: Vec<String> = Channel::ALL
            .iter()
            .map(|c| c.wire_name(&self.prefix))
            .collect();
        pubsub
            .subscribe(names)
            .await
            .map_err(|e| GatewayError::Bus(e.to_string()))?;
        tracing::info!(channels = Channel::ALL.len(), prefix = %self.prefix, "subscribed to redis bus");

        let prefix = self.prefix.clone();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let decoded = decode(&msg, &prefix);
            async move { decoded }
        });
        Ok(stream.boxed())
    }
}

fn decode(msg: &redis::Msg, prefix: &str) -> Option<RawEnvelope> {
    let name = msg.get_channel_name();
    let channel = match Channel::from_wire(name, prefix) {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(channel = %name, error = %e, "ignoring message on unknown channel");
            return None;
        }
    };
    match msg.get_payload::<String>() {
        Ok(payload) => Some(RawEnvelope { channel, payload }),
        Err(e) => {
            tracing::warn!(channel = %channel, error = %e, "ignoring undecodable bus payload");
            None
        }
    }
}
