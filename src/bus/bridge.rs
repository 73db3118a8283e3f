//! Validating bridge between gateways and the [`MessageBus`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::task::JoinHandle;

use super::{EnvelopeDispatcher, MessageBus};
use crate::domain::BusEvent;
use crate::error::GatewayError;

/// Publishes validated events and feeds received ones to a dispatcher.
#[derive(Debug)]
pub struct EventBridge {
    bus: Arc<dyn MessageBus>,
    published: AtomicU64,
    publish_failures: AtomicU64,
}

impl EventBridge {
    /// Creates a bridge over the given bus.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    /// Publishes an event and reports failures to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the transport rejects the publish,
    /// or [`GatewayError::Internal`] if the envelope cannot be serialized.
    pub async fn try_publish(&self, event: &BusEvent) -> Result<(), GatewayError> {
        let payload = event.to_wire()?;
        let channel = event.channel();
        match self.bus.publish(channel, payload).await {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(channel = %channel, event = %event.envelope().event, "published");
                Ok(())
            }
            Err(e) => {
                self.publish_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Publishes an event fire-and-forget: failures are logged, never
    /// returned.
    pub async fn publish(&self, event: &BusEvent) {
        if let Err(e) = self.try_publish(event).await {
            tracing::warn!(channel = %event.channel(), error = %e, "publish failed, event dropped");
        }
    }

    /// Returns the number of successful publishes.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Returns the number of failed publishes.
    #[must_use]
    pub fn publish_failure_count(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Subscribes to the bus and spawns the ingestion loop.
    ///
    /// The subscription is established before this returns, so events
    /// published afterwards are guaranteed to reach `dispatcher`. Each
    /// received event is prepared in order, then dispatched on its own task.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the subscription cannot be set up.
    pub async fn start(
        &self,
        dispatcher: Arc<dyn EnvelopeDispatcher>,
    ) -> Result<JoinHandle<()>, GatewayError> {
        let mut stream = self.bus.subscribe().await?;

        let handle = tokio::spawn(async move {
            while let Some(raw) = stream.next().await {
                let event = match BusEvent::from_wire(raw.channel, &raw.payload) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(channel = %raw.channel, error = %e, "dropping malformed envelope");
                        continue;
                    }
                };
                dispatcher.prepare(&event).await;
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher.dispatch(event).await;
                });
            }
            tracing::warn!("bus subscription ended");
        });
        Ok(handle)
    }
}
