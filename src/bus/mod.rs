//! Event bus bridge: publish envelopes, subscribe every process to them.
//!
//! A [`MessageBus`] moves raw `(channel, payload)` pairs between processes.
//! The [`EventBridge`] sits on top: it validates envelopes into
//! [`BusEvent`]s on the way out and on the way in, and hands every received
//! event to the process-wide [`EnvelopeDispatcher`]. Local state changes run
//! in arrival order on the ingestion loop; the emit fan-out runs on its own
//! task so a slow emit never stalls ingestion.

pub mod bridge;
pub mod memory_bus;
pub mod redis_bus;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{BusEvent, Channel};
use crate::error::GatewayError;

pub use bridge::EventBridge;
pub use memory_bus::MemoryBus;
pub use redis_bus::RedisBus;

/// One undecoded message as it travelled on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope {
    /// Channel the message arrived on.
    pub channel: Channel,
    /// JSON text of the envelope.
    pub payload: String,
}

/// Cross-process publish/subscribe transport.
#[async_trait]
pub trait MessageBus: Send + Sync + std::fmt::Debug {
    /// Publishes `payload` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the transport rejects the publish.
    async fn publish(&self, channel: Channel, payload: String) -> Result<(), GatewayError>;

    /// Subscribes to every channel of the taxonomy.
    ///
    /// The returned stream ends when the transport closes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the subscription cannot be set up.
    async fn subscribe(&self) -> Result<BoxStream<'static, RawEnvelope>, GatewayError>;
}

/// Process-wide callback invoked once per received event.
#[async_trait]
pub trait EnvelopeDispatcher: Send + Sync + std::fmt::Debug {
    /// Applies order-sensitive local state for `event`.
    ///
    /// Awaited on the ingestion loop in arrival order, before
    /// [`dispatch`](Self::dispatch) is spawned for the same event.
    async fn prepare(&self, _event: &BusEvent) {}

    /// Routes one event to local connections. Never fails: delivery
    /// problems are logged and swallowed.
    async fn dispatch(&self, event: BusEvent);
}
