//! WebSocket connection state machine.
//!
//! Drives one socket from upgrade to close: registers the outbound queue in
//! the [`ConnectionHub`], runs the namespace gateway's connect hook, then
//! multiplexes client frames and queued deliveries until either side goes
//! away. Teardown always runs, exactly once.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;

use super::hub::{ConnectionHub, Outbound};
use super::messages::{ClientAction, ConnectAuth, WsMessage};
use crate::domain::{ConnectionHandle, RoomKey};
use crate::error::GatewayError;
use crate::gateway::NamespaceGateway;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgraded, connect hook not finished.
    Connecting,
    /// Connect hook accepted the connection.
    Authenticated,
    /// Authenticated, not in any conversation room.
    Idle,
    /// Member of at least one conversation room.
    InConversation,
    /// Closed; no further transitions.
    Disconnected,
}

impl ConnectionState {
    /// Returns `true` if moving to `next` is allowed.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        use ConnectionState::{Authenticated, Connecting, Disconnected, Idle, InConversation};
        matches!(
            (self, next),
            (Connecting, Authenticated | Disconnected)
                | (Authenticated, Idle | InConversation | Disconnected)
                | (Idle, InConversation | Disconnected)
                | (InConversation, Idle | InConversation | Disconnected)
        )
    }

    /// Moves to `next` if allowed; otherwise stays put.
    pub fn advance(&mut self, next: Self) -> bool {
        if self.can_transition(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(
    socket: WebSocket,
    auth: ConnectAuth,
    gateway: Arc<dyn NamespaceGateway>,
    hub: Arc<ConnectionHub>,
    outbound_buffer: usize,
) {
    let namespace = gateway.namespace();
    let handle = ConnectionHandle::new();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(outbound_buffer.max(1));
    let mut state = ConnectionState::Connecting;

    hub.register(handle.clone(), namespace, tx).await;

    let admission = match gateway.on_connect(&handle, &auth).await {
        Ok(admission) => admission,
        Err(e) => {
            tracing::info!(handle = %handle, namespace = %namespace, error = %e, "connection rejected");
            let frame = WsMessage::error("connect_error", e.error_code(), &e.to_string());
            let _ = ws_tx.send(Message::text(frame.to_json())).await;
            let _ = ws_tx.send(Message::Close(None)).await;
            hub.unregister(&handle).await;
            return;
        }
    };
    state.advance(ConnectionState::Authenticated);
    state.advance(ConnectionState::Idle);

    let connected = WsMessage::response(
        "connected",
        json!({
            "sid": handle,
            "namespace": namespace,
            "actor_id": admission.actor_id,
            "organization_id": admission.organization_id,
        }),
    );
    let mut open = ws_tx.send(Message::text(connected.to_json())).await.is_ok();
    let mut conversations = 0_usize;

    while open {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text(gateway.as_ref(), &handle, &text).await {
                            open = ws_tx.send(Message::text(reply.to_json())).await.is_ok();
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => open = false,
                    Some(Ok(_)) => {}
                }
            }
            item = rx.recv() => {
                match item {
                    Some(Outbound::Frame(frame)) => {
                        open = ws_tx.send(Message::text(frame.to_json())).await.is_ok();
                    }
                    Some(Outbound::Joined(RoomKey::Conversation(_))) => {
                        conversations += 1;
                        state.advance(ConnectionState::InConversation);
                    }
                    Some(Outbound::Left(RoomKey::Conversation(_))) => {
                        conversations = conversations.saturating_sub(1);
                        if conversations == 0 {
                            state.advance(ConnectionState::Idle);
                        }
                    }
                    Some(Outbound::Joined(_) | Outbound::Left(_)) => {}
                    None => open = false,
                }
            }
        }
    }

    state.advance(ConnectionState::Disconnected);
    hub.unregister(&handle).await;
    gateway.on_disconnect(&handle).await;
    tracing::debug!(handle = %handle, namespace = %namespace, "ws connection closed");
}

/// Decodes one client frame and runs it. Returns a direct reply, if any.
async fn handle_text(
    gateway: &dyn NamespaceGateway,
    handle: &ConnectionHandle,
    text: &str,
) -> Option<WsMessage> {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            tracing::debug!(handle = %handle, error = %e, "undecodable client frame");
            return Some(WsMessage::error("invalid_frame", 1001, "malformed client frame"));
        }
    };

    let name = action.name();
    let pong = matches!(action, ClientAction::Ping);
    match gateway.on_action(handle, action).await {
        Ok(()) => {}
        Err(GatewayError::StaleOperation(reason)) => {
            tracing::debug!(handle = %handle, action = name, reason = %reason, "action ignored");
        }
        Err(e) => tracing::warn!(handle = %handle, action = name, error = %e, "action failed"),
    }
    pong.then(|| WsMessage::response("pong", json!({})))
}
