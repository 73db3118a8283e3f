//! Actions shared by the agent and customer chat gateways.

use serde_json::Value;
use tracing::{debug, warn};

use super::GatewayContext;
use crate::domain::{ActorType, BusEvent, Channel, ConnectionHandle, Envelope, events};
use crate::error::GatewayError;
use crate::ws::messages::{SeenData, TypingData};

/// Relays a typing or stop-typing indicator onto the bus.
///
/// # Errors
///
/// Returns [`GatewayError::StaleOperation`] when `conversation_id` or
/// `organization_id` is missing.
pub async fn relay_typing(
    ctx: &GatewayContext,
    actor: ActorType,
    handle: &ConnectionHandle,
    data: TypingData,
    stopped: bool,
) -> Result<(), GatewayError> {
    let (Some(conversation_id), Some(organization_id)) =
        (data.conversation_id, data.organization_id)
    else {
        return Err(GatewayError::StaleOperation(
            "typing needs conversation_id and organization_id".to_string(),
        ));
    };

    let (channel, event_name) = if stopped {
        (Channel::TypingStop, events::STOP_TYPING)
    } else {
        (Channel::Typing, events::RECEIVE_TYPING)
    };
    let mut envelope = Envelope::new(event_name)
        .organization(organization_id)
        .conversation(conversation_id)
        .sender(handle.clone())
        .customer_flag(actor.is_customer());
    if !stopped {
        envelope = envelope
            .with("message", data.message.unwrap_or_default())
            .with("mode", data.mode.unwrap_or_else(|| "typing".to_string()));
    }

    ctx.bridge.publish(&BusEvent::new(channel, envelope)?).await;
    Ok(())
}

/// Marks a message seen and publishes the seen event.
///
/// The organization falls back to the caller's session when the client
/// omits it.
///
/// # Errors
///
/// - [`GatewayError::StaleOperation`] when the message id is missing or
///   unknown, or no organization can be determined.
/// - [`GatewayError::Domain`] / [`GatewayError::RegistryUnavailable`] on
///   backend failure.
pub async fn mark_seen(
    ctx: &GatewayContext,
    actor: ActorType,
    handle: &ConnectionHandle,
    data: SeenData,
) -> Result<(), GatewayError> {
    let message_id = data.message_id.ok_or_else(|| {
        GatewayError::StaleOperation("message_seen without message_id".to_string())
    })?;
    if ctx.domain.resolve_message(message_id).await?.is_none() {
        return Err(GatewayError::StaleOperation(format!(
            "message {message_id} not found"
        )));
    }
    let message = ctx
        .domain
        .mark_message_seen(message_id)
        .await?
        .ok_or_else(|| GatewayError::StaleOperation(format!("message {message_id} vanished")))?;

    let organization_id = match data.organization_id {
        Some(id) => id,
        None => ctx
            .sessions
            .session(handle)
            .await?
            .map(|s| s.organization_id)
            .ok_or_else(|| {
                GatewayError::StaleOperation("message_seen without organization".to_string())
            })?,
    };

    let envelope = Envelope::new(events::MESSAGE_SEEN)
        .organization(organization_id)
        .conversation(message.conversation_id)
        .sender(handle.clone())
        .customer_flag(actor.is_customer())
        .with("message_id", message.id)
        .with("message", message.snapshot);
    ctx.bridge
        .publish(&BusEvent::new(Channel::MessageSeen, envelope)?)
        .await;
    Ok(())
}

/// Undoes a chat connect whose session write failed after the actor was
/// marked online.
///
/// The half-written registry entries of `handle` are compare-and-deleted.
/// The actor is only marked offline again when no other connection of the
/// same actor was live before this attempt (`previous`) or holds the actor
/// key now.
pub async fn rollback_connect(
    ctx: &GatewayContext,
    actor: ActorType,
    handle: &ConnectionHandle,
    actor_id: i64,
    previous: Option<&ConnectionHandle>,
) {
    if let Err(e) = ctx.sessions.clear_session(handle).await {
        warn!(handle = %handle, error = %e, "rollback of rejected session failed");
    }
    if previous.is_some_and(|p| p != handle) || held_by_other(ctx, actor, actor_id, handle).await {
        debug!(handle = %handle, actor_id, "actor still connected elsewhere; presence unchanged");
        return;
    }
    if let Err(e) = ctx.domain.mark_actor_online(actor, actor_id, false).await {
        warn!(handle = %handle, actor_id, error = %e, "rollback of online flag failed");
    }
}

/// True when the actor key names a connection other than `handle`.
async fn held_by_other(
    ctx: &GatewayContext,
    actor: ActorType,
    actor_id: i64,
    handle: &ConnectionHandle,
) -> bool {
    match ctx.sessions.handle_for_actor(actor, actor_id).await {
        Ok(Some(current)) => current != *handle,
        Ok(None) => false,
        Err(e) => {
            warn!(handle = %handle, error = %e, "actor lookup failed");
            false
        }
    }
}

/// Full chat teardown. Every step runs even if an earlier one failed.
///
/// 1. read the session;
/// 2. customers leave their current conversation (publishes the leave);
/// 3. mark the actor offline and publish the offline event, unless a newer
///    connection of the same actor has already taken over;
/// 4. clear the registry entries;
/// 5. purge the handle from every membership set.
pub async fn teardown(ctx: &GatewayContext, actor: ActorType, handle: &ConnectionHandle) {
    let session = ctx.sessions.session(handle).await.unwrap_or_else(|e| {
        warn!(handle = %handle, error = %e, "session lookup failed during teardown");
        None
    });

    if actor.is_customer() {
        match ctx.conversations.customer_leave(handle).await {
            Ok(_) | Err(GatewayError::StaleOperation(_)) => {}
            Err(e) => warn!(handle = %handle, error = %e, "conversation leave failed during teardown"),
        }
    }

    match &session {
        Some(session) => {
            if held_by_other(ctx, actor, session.actor_id, handle).await {
                debug!(handle = %handle, actor_id = session.actor_id, "actor reconnected elsewhere; presence unchanged");
            } else {
                publish_offline(ctx, actor, handle, session.actor_id, session.organization_id)
                    .await;
            }
        }
        None => debug!(handle = %handle, "no session for handle; presence unchanged"),
    }

    if let Err(e) = ctx.sessions.clear_session(handle).await {
        warn!(handle = %handle, error = %e, "registry cleanup failed");
    }
    if let Err(e) = ctx.rooms.purge_handle(handle).await {
        warn!(handle = %handle, error = %e, "membership cleanup failed");
    }
}

async fn publish_offline(
    ctx: &GatewayContext,
    actor: ActorType,
    handle: &ConnectionHandle,
    actor_id: i64,
    organization_id: i64,
) {
    let snapshot = match ctx.domain.mark_actor_online(actor, actor_id, false).await {
        Ok(snapshot) => snapshot.unwrap_or(Value::Null),
        Err(e) => {
            warn!(handle = %handle, actor_id, error = %e, "marking actor offline failed");
            Value::Null
        }
    };

    let (channel, event_name, id_key, snapshot_key) = match actor {
        ActorType::Agent => (
            Channel::AgentOffline,
            events::AGENT_DISCONNECTED,
            "agent_id",
            "user",
        ),
        ActorType::Customer => (
            Channel::CustomerOffline,
            events::CUSTOMER_DISCONNECTED,
            "customer_id",
            "customer",
        ),
    };
    let envelope = Envelope::new(event_name)
        .organization(organization_id)
        .sender(handle.clone())
        .customer_flag(actor.is_customer())
        .with("mode", "offline")
        .with(id_key, actor_id)
        .with(snapshot_key, snapshot);
    match BusEvent::new(channel, envelope) {
        Ok(event) => ctx.bridge.publish(&event).await,
        Err(e) => warn!(handle = %handle, error = %e, "offline event rejected"),
    }
}
