//! Namespace gateways: connection lifecycle and client actions.
//!
//! Each namespace has one [`NamespaceGateway`]. The transport loop in
//! [`crate::ws::connection`] calls `on_connect` once, `on_action` for every
//! client frame and `on_disconnect` exactly once when the socket is gone.
//!
//! | Gateway            | Auth                         | Baseline room          |
//! |--------------------|------------------------------|------------------------|
//! | [`AgentGateway`]   | token                        | `agent-notify:{org}`   |
//! | [`CustomerGateway`]| `customer_id` + `organization_id` | `customer-notify:{org}` |
//! | [`TicketGateway`]  | token                        | `ticket:{ticket_id}`   |
//! | [`SlaGateway`]     | token                        | `user:{user_id}`       |

pub mod agent;
pub mod chat;
pub mod customer;
pub mod ticket;

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::EventBridge;
use crate::domain::{ConnectionHandle, Namespace, RoomMembership, SessionRegistry};
use crate::error::GatewayError;
use crate::persistence::SharedStore;
use crate::service::{ConversationService, DomainStore, TokenVerifier};
use crate::ws::hub::ConnectionHub;
use crate::ws::messages::{ClientAction, ConnectAuth};

pub use agent::AgentGateway;
pub use customer::CustomerGateway;
pub use ticket::{SlaGateway, TicketGateway};

/// Outcome of an accepted connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// User id or customer id of the connected actor.
    pub actor_id: i64,
    /// Organization, when the namespace knows it.
    pub organization_id: Option<i64>,
}

/// Lifecycle hooks of one namespace.
#[async_trait]
pub trait NamespaceGateway: Send + Sync + std::fmt::Debug {
    /// Namespace served by this gateway.
    fn namespace(&self) -> Namespace;

    /// Authenticates a new connection and sets up its session and rooms.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RejectedConnection`] when the connection must
    /// be refused. No session survives a rejection.
    async fn on_connect(
        &self,
        handle: &ConnectionHandle,
        auth: &ConnectAuth,
    ) -> Result<Admission, GatewayError>;

    /// Handles one client action.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StaleOperation`] for actions that are ignored
    /// (missing ids, unknown messages); other variants for backend failures.
    /// The transport logs the error and never surfaces it to the client.
    async fn on_action(
        &self,
        handle: &ConnectionHandle,
        action: ClientAction,
    ) -> Result<(), GatewayError>;

    /// Tears the connection's state down. Never fails.
    async fn on_disconnect(&self, handle: &ConnectionHandle);
}

/// Collaborators shared by every gateway.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    /// Handle ↔ actor registry.
    pub sessions: SessionRegistry,
    /// Conversation room membership.
    pub rooms: RoomMembership,
    /// Local connections and rooms.
    pub hub: Arc<ConnectionHub>,
    /// Bus publisher.
    pub bridge: Arc<EventBridge>,
    /// Business database.
    pub domain: Arc<dyn DomainStore>,
    /// Agent token verification.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Join/leave orchestration.
    pub conversations: ConversationService,
}

impl GatewayContext {
    /// Wires the context from its backends.
    #[must_use]
    pub fn new(
        store: Arc<dyn SharedStore>,
        hub: Arc<ConnectionHub>,
        bridge: Arc<EventBridge>,
        domain: Arc<dyn DomainStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let sessions = SessionRegistry::new(Arc::clone(&store));
        let rooms = RoomMembership::new(store);
        let conversations = ConversationService::new(
            sessions.clone(),
            rooms.clone(),
            Arc::clone(&hub),
            Arc::clone(&bridge),
            Arc::clone(&domain),
        );
        Self {
            sessions,
            rooms,
            hub,
            bridge,
            domain,
            verifier,
            conversations,
        }
    }
}

/// One gateway per namespace.
#[derive(Debug, Clone)]
pub struct Gateways {
    /// `/ws/agent`.
    pub agent: Arc<AgentGateway>,
    /// `/ws/customer`.
    pub customer: Arc<CustomerGateway>,
    /// `/ws/ticket`.
    pub ticket: Arc<TicketGateway>,
    /// `/ws/ticket-sla`.
    pub ticket_sla: Arc<SlaGateway>,
}

impl Gateways {
    /// Builds every gateway over one shared context.
    #[must_use]
    pub fn new(ctx: &GatewayContext) -> Self {
        Self {
            agent: Arc::new(AgentGateway::new(ctx.clone())),
            customer: Arc::new(CustomerGateway::new(ctx.clone())),
            ticket: Arc::new(TicketGateway::new(ctx.clone())),
            ticket_sla: Arc::new(SlaGateway::new(ctx.clone())),
        }
    }

    /// Gateway serving `namespace`.
    #[must_use]
    pub fn for_namespace(&self, namespace: Namespace) -> Arc<dyn NamespaceGateway> {
        match namespace {
            Namespace::Agent => Arc::clone(&self.agent) as Arc<dyn NamespaceGateway>,
            Namespace::Customer => Arc::clone(&self.customer) as Arc<dyn NamespaceGateway>,
            Namespace::Ticket => Arc::clone(&self.ticket) as Arc<dyn NamespaceGateway>,
            Namespace::TicketSla => Arc::clone(&self.ticket_sla) as Arc<dyn NamespaceGateway>,
        }
    }
}
