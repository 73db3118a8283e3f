//! Process-local connection and room table.
//!
//! [`ConnectionHub`] owns the outbound queue of every connection this
//! process serves and the local view of which handles sit in which room.
//! Rooms are keyed by `(namespace, room)`, so routing never crosses
//! namespaces implicitly. Emits never block: a full or closed queue drops
//! the frame for that handle and is counted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};

use super::messages::WsMessage;
use crate::domain::{ConnectionHandle, Namespace, RoomKey};

/// Item queued for a connection's writer.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A frame to write to the socket.
    Frame(Arc<WsMessage>),
    /// The connection was added to a room.
    Joined(RoomKey),
    /// The connection was removed from a room.
    Left(RoomKey),
}

#[derive(Debug)]
struct LocalConnection {
    namespace: Namespace,
    sender: mpsc::Sender<Outbound>,
}

/// Live connections and rooms of this process.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionHandle, LocalConnection>>,
    rooms: RwLock<HashMap<(Namespace, RoomKey), HashSet<ConnectionHandle>>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl ConnectionHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outbound queue of a freshly upgraded connection.
    pub async fn register(
        &self,
        handle: ConnectionHandle,
        namespace: Namespace,
        sender: mpsc::Sender<Outbound>,
    ) {
        tracing::debug!(handle = %handle, namespace = %namespace, "connection registered");
        self.connections
            .write()
            .await
            .insert(handle, LocalConnection { namespace, sender });
    }

    /// Drops a connection and removes it from every local room.
    ///
    /// Returns the rooms it was removed from.
    pub async fn unregister(&self, handle: &ConnectionHandle) -> Vec<RoomKey> {
        let mut rooms = self.rooms.write().await;
        let mut removed_from = Vec::new();
        for ((_, room), members) in rooms.iter_mut() {
            if members.remove(handle) {
                removed_from.push(*room);
            }
        }
        rooms.retain(|_, members| !members.is_empty());
        drop(rooms);

        self.connections.write().await.remove(handle);
        tracing::debug!(handle = %handle, rooms = removed_from.len(), "connection unregistered");
        removed_from
    }

    /// Adds a local connection to a room of its namespace.
    ///
    /// Returns `false` when the handle is not local to this process or
    /// belongs to another namespace. Joining twice is harmless.
    pub async fn join(&self, namespace: Namespace, room: RoomKey, handle: &ConnectionHandle) -> bool {
        let mut rooms = self.rooms.write().await;
        let connections = self.connections.read().await;
        let Some(conn) = connections.get(handle).filter(|c| c.namespace == namespace) else {
            return false;
        };

        let inserted = rooms
            .entry((namespace, room))
            .or_default()
            .insert(handle.clone());
        if inserted {
            let _ = conn.sender.try_send(Outbound::Joined(room));
            tracing::debug!(handle = %handle, namespace = %namespace, room = %room, "joined room");
        }
        true
    }

    /// Removes a connection from a room. Returns `true` if it was a member.
    pub async fn leave(
        &self,
        namespace: Namespace,
        room: RoomKey,
        handle: &ConnectionHandle,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        let key = (namespace, room);
        let Some(members) = rooms.get_mut(&key) else {
            return false;
        };
        let removed = members.remove(handle);
        if members.is_empty() {
            rooms.remove(&key);
        }
        drop(rooms);

        if removed {
            if let Some(conn) = self.connections.read().await.get(handle) {
                let _ = conn.sender.try_send(Outbound::Left(room));
            }
            tracing::debug!(handle = %handle, namespace = %namespace, room = %room, "left room");
        }
        removed
    }

    /// Emits an event to every local member of a room, skipping `exclude`.
    ///
    /// Returns the number of connections the frame was queued for.
    pub async fn emit(
        &self,
        namespace: Namespace,
        room: RoomKey,
        event: &str,
        data: &Value,
        exclude: Option<&ConnectionHandle>,
    ) -> usize {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(&(namespace, room)) else {
            tracing::trace!(namespace = %namespace, room = %room, event, "no local members");
            return 0;
        };

        let frame = Arc::new(WsMessage::event(event, data.clone()));
        let connections = self.connections.read().await;
        let mut sent = 0;
        let mut failed = 0;
        for handle in members {
            if exclude == Some(handle) {
                continue;
            }
            let Some(conn) = connections.get(handle) else {
                failed += 1;
                continue;
            };
            match conn.sender.try_send(Outbound::Frame(Arc::clone(&frame))) {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(handle = %handle, room = %room, error = %e, "dropping frame for connection");
                }
            }
        }

        self.delivered.fetch_add(sent as u64, Ordering::Relaxed);
        self.dropped.fetch_add(failed as u64, Ordering::Relaxed);
        tracing::debug!(
            namespace = %namespace,
            room = %room,
            event,
            recipients = sent,
            failed,
            "emitted to room"
        );
        sent
    }

    /// Number of local members of a room.
    pub async fn room_size(&self, namespace: Namespace, room: RoomKey) -> usize {
        self.rooms
            .read()
            .await
            .get(&(namespace, room))
            .map_or(0, HashSet::len)
    }

    /// Number of non-empty local rooms across all namespaces.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Live connection count per namespace, in [`Namespace::ALL`] order.
    pub async fn connection_counts(&self) -> Vec<(Namespace, usize)> {
        let connections = self.connections.read().await;
        Namespace::ALL
            .iter()
            .map(|ns| {
                let count = connections.values().filter(|c| c.namespace == *ns).count();
                (*ns, count)
            })
            .collect()
    }

    /// Frames queued since start.
    #[must_use]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Frames dropped since start (full or closed queues, vanished handles).
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
