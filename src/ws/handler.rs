//! Axum WebSocket upgrade handlers, one per namespace.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use super::messages::ConnectAuth;
use crate::app_state::AppState;
use crate::domain::Namespace;

fn upgrade(
    ws: WebSocketUpgrade,
    state: &AppState,
    namespace: Namespace,
    auth: ConnectAuth,
) -> Response {
    let gateway = state.gateways.for_namespace(namespace);
    let hub = Arc::clone(&state.hub);
    let buffer = state.config.outbound_buffer;
    ws.on_upgrade(move |socket| run_connection(socket, auth, gateway, hub, buffer))
        .into_response()
}

/// `GET /ws/agent`: agent chat connections.
pub async fn agent_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(auth): Query<ConnectAuth>,
) -> impl IntoResponse {
    upgrade(ws, &state, Namespace::Agent, auth)
}

/// `GET /ws/customer`: customer chat connections.
pub async fn customer_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(auth): Query<ConnectAuth>,
) -> impl IntoResponse {
    upgrade(ws, &state, Namespace::Customer, auth)
}

/// `GET /ws/ticket`: ticket thread watchers.
pub async fn ticket_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(auth): Query<ConnectAuth>,
) -> impl IntoResponse {
    upgrade(ws, &state, Namespace::Ticket, auth)
}

/// `GET /ws/ticket-sla`: SLA alert subscribers.
pub async fn ticket_sla_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(auth): Query<ConnectAuth>,
) -> impl IntoResponse {
    upgrade(ws, &state, Namespace::TicketSla, auth)
}
