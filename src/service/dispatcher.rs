//! Subscriber-side dispatch of bus events to local connections.

use std::sync::Arc;

use async_trait::async_trait;

use super::broadcast_policy::route;
use crate::bus::EnvelopeDispatcher;
use crate::domain::{BusEvent, Namespace, RoomKey};
use crate::ws::hub::ConnectionHub;

/// Applies the broadcast policy to this process's [`ConnectionHub`].
///
/// Join and leave events additionally attach or detach the named handle in
/// its local conversation room when this process owns it, so joins requested
/// on another process still take effect here. That happens in
/// [`prepare`](EnvelopeDispatcher::prepare), so a join followed by a leave
/// for the same handle always ends detached.
#[derive(Debug, Clone)]
pub struct LocalDispatcher {
    hub: Arc<ConnectionHub>,
}

impl LocalDispatcher {
    /// Creates a dispatcher over `hub`.
    #[must_use]
    pub fn new(hub: Arc<ConnectionHub>) -> Self {
        Self { hub }
    }

    async fn sync_rooms(&self, event: &BusEvent) {
        let (Some(handle), Some(conversation_id)) =
            (event.sender(), event.envelope().conversation_id)
        else {
            return;
        };
        let room = RoomKey::Conversation(conversation_id);
        match event {
            BusEvent::CustomerJoinConversation(_) => {
                self.hub.join(Namespace::Customer, room, handle).await;
            }
            BusEvent::AgentJoinConversation(_) => {
                self.hub.join(Namespace::Agent, room, handle).await;
            }
            BusEvent::CustomerLeaveConversation(_) => {
                self.hub.leave(Namespace::Customer, room, handle).await;
            }
            BusEvent::AgentLeaveConversation(_) => {
                self.hub.leave(Namespace::Agent, room, handle).await;
            }
            _ => {}
        }
    }
}

#[async_trait]
impl EnvelopeDispatcher for LocalDispatcher {
    async fn prepare(&self, event: &BusEvent) {
        self.sync_rooms(event).await;
    }

    async fn dispatch(&self, event: BusEvent) {
        let envelope = event.envelope();
        let data = envelope.to_value();
        for delivery in route(&event) {
            self.hub
                .emit(
                    delivery.namespace,
                    delivery.room,
                    &envelope.event,
                    &data,
                    delivery.exclude.as_ref(),
                )
                .await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::bus::{EventBridge, MemoryBus, MessageBus};
    use crate::domain::{Channel, ConnectionHandle, Envelope, events};
    use crate::ws::hub::Outbound;

    fn membership_event(
        channel: Channel,
        name: &str,
        handle: &ConnectionHandle,
        id: i64,
    ) -> BusEvent {
        let Ok(event) = BusEvent::new(
            channel,
            Envelope::new(name)
                .organization(7)
                .conversation(id)
                .sender(handle.clone()),
        ) else {
            panic!("invalid membership event");
        };
        event
    }

    fn frames(rx: &mut mpsc::Receiver<Outbound>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Frame(frame) = item {
                names.push(frame.payload["event"].as_str().unwrap_or_default().to_string());
            }
        }
        names
    }

    #[tokio::test]
    async fn remote_join_attaches_local_handle() {
        let hub = Arc::new(ConnectionHub::new());
        let (tx, _rx) = mpsc::channel(8);
        let customer = ConnectionHandle::from("c9");
        hub.register(customer.clone(), Namespace::Customer, tx).await;

        let dispatcher = LocalDispatcher::new(Arc::clone(&hub));
        let Ok(join) = BusEvent::new(
            Channel::CustomerJoinConversation,
            Envelope::new(events::CUSTOMER_CONVERSATION_JOIN)
                .organization(7)
                .conversation(42)
                .sender(customer.clone()),
        ) else {
            panic!("invalid join");
        };
        dispatcher.prepare(&join).await;

        assert_eq!(
            hub.room_size(Namespace::Customer, RoomKey::Conversation(42)).await,
            1
        );
    }

    #[tokio::test]
    async fn agent_reply_reaches_customer_and_agents() {
        let hub = Arc::new(ConnectionHub::new());
        let (ctx, mut crx) = mpsc::channel(8);
        let (atx, mut arx) = mpsc::channel(8);
        let customer = ConnectionHandle::from("c9");
        let agent = ConnectionHandle::from("a1");
        hub.register(customer.clone(), Namespace::Customer, ctx).await;
        hub.register(agent.clone(), Namespace::Agent, atx).await;
        hub.join(Namespace::Customer, RoomKey::Conversation(42), &customer).await;
        hub.join(Namespace::Agent, RoomKey::AgentNotify(7), &agent).await;

        let dispatcher = LocalDispatcher::new(Arc::clone(&hub));
        let Ok(reply) = BusEvent::new(
            Channel::Message,
            Envelope::new(events::RECEIVE_MESSAGE)
                .organization(7)
                .conversation(42)
                .customer_flag(false)
                .sender(agent.clone()),
        ) else {
            panic!("invalid message");
        };
        dispatcher.dispatch(reply).await;

        assert_eq!(frames(&mut crx), vec![events::RECEIVE_MESSAGE.to_string()]);
        assert_eq!(frames(&mut arx), vec![events::RECEIVE_MESSAGE.to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn join_then_leave_always_ends_detached() {
        let hub = Arc::new(ConnectionHub::new());
        let (tx, _rx) = mpsc::channel(8);
        let customer = ConnectionHandle::from("c9");
        hub.register(customer.clone(), Namespace::Customer, tx).await;

        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new(4096));
        let bridge = EventBridge::new(bus);
        let Ok(_task) = bridge
            .start(Arc::new(LocalDispatcher::new(Arc::clone(&hub))))
            .await
        else {
            panic!("start failed");
        };

        for id in 1..=500 {
            let join = membership_event(
                Channel::CustomerJoinConversation,
                events::CUSTOMER_CONVERSATION_JOIN,
                &customer,
                id,
            );
            let leave = membership_event(
                Channel::CustomerLeaveConversation,
                events::CUSTOMER_CONVERSATION_LEAVE,
                &customer,
                id,
            );
            let Ok(()) = bridge.try_publish(&join).await else {
                panic!("publish failed");
            };
            let Ok(()) = bridge.try_publish(&leave).await else {
                panic!("publish failed");
            };
        }
        let marker = membership_event(
            Channel::CustomerJoinConversation,
            events::CUSTOMER_CONVERSATION_JOIN,
            &customer,
            10_000,
        );
        let Ok(()) = bridge.try_publish(&marker).await else {
            panic!("publish failed");
        };

        let marker_room = RoomKey::Conversation(10_000);
        let mut waited = 0;
        while hub.room_size(Namespace::Customer, marker_room).await == 0 {
            waited += 1;
            assert!(waited < 200, "ingestion never reached the marker");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        for id in 1..=500 {
            assert_eq!(
                hub.room_size(Namespace::Customer, RoomKey::Conversation(id)).await,
                0,
                "still attached to conversation {id}"
            );
        }
    }
}
