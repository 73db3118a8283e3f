//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::bus::{EventBridge, MessageBus};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{GatewayContext, Gateways};
use crate::persistence::SharedStore;
use crate::service::{
    ConversationService, DomainStore, LocalDispatcher, TicketService, TokenVerifier,
};
use crate::ws::hub::ConnectionHub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GatewayConfig>,
    /// Shared session store (health checks).
    pub store: Arc<dyn SharedStore>,
    /// Connections and rooms of this process.
    pub hub: Arc<ConnectionHub>,
    /// Bus publisher/subscriber.
    pub bridge: Arc<EventBridge>,
    /// Namespace gateways behind the WebSocket routes.
    pub gateways: Gateways,
    /// Server-driven joins and membership queries.
    pub conversations: ConversationService,
    /// Ticket and SLA publishing.
    pub tickets: TicketService,
}

impl AppState {
    /// Wires every component of one gateway process.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn SharedStore>,
        bus: Arc<dyn MessageBus>,
        domain: Arc<dyn DomainStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let hub = Arc::new(ConnectionHub::new());
        let bridge = Arc::new(EventBridge::new(bus));
        let ctx = GatewayContext::new(
            Arc::clone(&store),
            Arc::clone(&hub),
            Arc::clone(&bridge),
            domain,
            verifier,
        );
        Self {
            config: Arc::new(config),
            store,
            gateways: Gateways::new(&ctx),
            conversations: ctx.conversations.clone(),
            tickets: TicketService::new(Arc::clone(&bridge)),
            hub,
            bridge,
        }
    }

    /// Subscribes this process to the bus and starts local fanout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Bus`] if the subscription cannot be opened.
    pub async fn start_dispatch(&self) -> Result<JoinHandle<()>, GatewayError> {
        let dispatcher = Arc::new(LocalDispatcher::new(Arc::clone(&self.hub)));
        self.bridge.start(dispatcher).await
    }
}
