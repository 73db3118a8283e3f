//! In-process bus on a broadcast channel.
//!
//! [`MemoryBus`] wraps a [`tokio::sync::broadcast`] channel. It stands in for
//! Redis pub/sub in single-node deployments and tests; several bridges
//! subscribed to one `MemoryBus` behave like several processes.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;

use super::{MessageBus, RawEnvelope};
use crate::domain::Channel;
use crate::error::GatewayError;

/// Broadcast bus for [`RawEnvelope`]s.
///
/// When the ring buffer is full, the oldest messages are dropped for lagging
/// subscribers, which log the gap and carry on.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    sender: broadcast::Sender<RawEnvelope>,
}

impl MemoryBus {
    /// Creates a new bus with the given channel capacity (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the current number of live subscriptions.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, channel: Channel, payload: String) -> Result<(), GatewayError> {
        // No subscribers means nobody to deliver to, which is not an error.
        let _ = self.sender.send(RawEnvelope { channel, payload });
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, RawEnvelope>, GatewayError> {
        let rx = self.sender.subscribe();
        let stream = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(raw) => return Some((raw, rx)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "bus subscriber lagged behind memory bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
