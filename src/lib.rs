//! # parley-gateway
//!
//! Real-time presence and conversation-routing gateway for agent/customer
//! chat.
//!
//! Agents and anonymous customers hold WebSocket connections to any number
//! of gateway processes. A shared store maps stable identities (user id,
//! customer id, conversation id) to the connection handles that currently
//! serve them, and a pub/sub bus carries event envelopes between processes.
//! Each process applies a fixed broadcast policy to every envelope and
//! emits it to the rooms it hosts locally.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket: agent, customer, ticket, ticket-sla)   Business services (REST)
//!     │                                                           │
//!     ├── WS transport (ws/) ── ConnectionHub (local rooms)       ├── REST handlers (api/)
//!     │                                                           │
//!     ├── Namespace gateways (gateway/)                           │
//!     │       │                                                   │
//!     │       ├── SessionRegistry / RoomMembership (domain/) ── SharedStore (Redis | memory)
//!     │       └── DomainStore (PostgreSQL), TokenVerifier (JWT)
//!     │
//!     └── EventBridge (bus/) ── MessageBus (Redis pub/sub | broadcast)
//!             │
//!             └── LocalDispatcher ── broadcast_policy::route ── ConnectionHub::emit
//! ```

pub mod api;
pub mod app_state;
pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod service;
pub mod ws;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::{agent_ws, customer_ws, ticket_sla_ws, ticket_ws};

/// Builds the full HTTP application: REST surface plus WebSocket routes.
///
/// The request timeout applies to REST only; upgraded sockets live until
/// either side closes.
pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.http_timeout_secs);

    let rest = api::build_router().layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            )),
    );

    let sockets = Router::new()
        .route("/ws/agent", get(agent_ws))
        .route("/ws/customer", get(customer_ws))
        .route("/ws/ticket", get(ticket_ws))
        .route("/ws/ticket-sla", get(ticket_sla_ws));

    Router::new()
        .merge(rest)
        .merge(sockets)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
