use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};

use crate::session::{Broadcast, BroadcastGateway, ConnectionId, SessionId};

pub mod message_types;

/// One frame queued for delivery to a websocket connection.
#[derive(Debug, Clone)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

struct RoomMember {
    identity: ConnectionId,
    sender: UnboundedSender<Frame>,
}

/// Tracks live websocket connections and which session room each one is
/// subscribed to. Implements the coordinator's `BroadcastGateway`.
///
/// Dead senders (closed connections whose cleanup has not run yet) are
/// dropped on the next broadcast to their room.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // session_id -> subscribed connections
    rooms: Arc<RwLock<HashMap<SessionId, Vec<RoomMember>>>>,
    // every live connection, joined to a room or not
    connections: Arc<RwLock<HashMap<ConnectionId, UnboundedSender<Frame>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted connection. The returned receiver is
    /// the connection's outbound frame queue; the ws actor drains it.
    pub async fn register(&self, identity: ConnectionId) -> UnboundedReceiver<Frame> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.connections.write().await;
        guard.insert(identity, tx);
        tracing::debug!(%identity, connections = guard.len(), "connection registered");
        rx
    }

    /// Drop a connection from the sender map and every room it joined.
    /// Must run when the ws actor stops, before the coordinator's
    /// `disconnect` broadcasts to the remaining members.
    pub async fn unregister(&self, identity: ConnectionId) {
        {
            let mut guard = self.connections.write().await;
            guard.remove(&identity);
        }
        let mut rooms = self.rooms.write().await;
        for members in rooms.values_mut() {
            members.retain(|member| member.identity != identity);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Subscribe a registered connection to a session room. Idempotent.
    pub async fn join_room(&self, session_id: &SessionId, identity: ConnectionId) {
        let sender = {
            let guard = self.connections.read().await;
            guard.get(&identity).cloned()
        };
        let Some(sender) = sender else {
            tracing::warn!(%identity, "join_room for unregistered connection");
            return;
        };

        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(session_id.clone()).or_default();
        if members.iter().all(|member| member.identity != identity) {
            members.push(RoomMember { identity, sender });
        }
    }

    pub async fn leave_room(&self, session_id: &SessionId, identity: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(session_id) {
            members.retain(|member| member.identity != identity);
            if members.is_empty() {
                rooms.remove(session_id);
            }
        }
    }

    pub async fn room_size(&self, session_id: &SessionId) -> usize {
        let guard = self.rooms.read().await;
        guard.get(session_id).map(|members| members.len()).unwrap_or(0)
    }

    fn encode(payload: &Broadcast) -> Option<Frame> {
        match payload {
            Broadcast::Chunk(chunk) => Some(Frame::Binary(chunk.clone())),
            Broadcast::Event(event) => match serde_json::to_string(event) {
                Ok(json) => Some(Frame::Text(json)),
                Err(err) => {
                    tracing::error!(error = %err, "failed to encode outbound event");
                    None
                }
            },
        }
    }
}

#[async_trait]
impl BroadcastGateway for ConnectionRegistry {
    async fn send_to_session(&self, session_id: &SessionId, payload: Broadcast) {
        let Some(frame) = Self::encode(&payload) else {
            return;
        };
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(session_id) {
            // Best-effort fan-out; a failed send means the connection is
            // gone, so drop it from the room.
            members.retain(|member| member.sender.send(frame.clone()).is_ok());
            if members.is_empty() {
                rooms.remove(session_id);
            }
        }
    }

    async fn send_to_connection(&self, identity: ConnectionId, payload: Broadcast) {
        let Some(frame) = Self::encode(&payload) else {
            return;
        };
        let guard = self.connections.read().await;
        if let Some(sender) = guard.get(&identity) {
            let _ = sender.send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;

    fn chat(session_id: &SessionId) -> Broadcast {
        Broadcast::Event(SessionEvent::Chat {
            session_id: session_id.clone(),
            author: "viewer".into(),
            text: "hi".into(),
        })
    }

    #[tokio::test]
    async fn broadcast_reaches_only_the_target_room() {
        let registry = ConnectionRegistry::new();
        let room_a = SessionId::generate();
        let room_b = SessionId::generate();

        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let mut rx_a = registry.register(a).await;
        let mut rx_b = registry.register(b).await;
        registry.join_room(&room_a, a).await;
        registry.join_room(&room_b, b).await;

        registry.send_to_session(&room_a, chat(&room_a)).await;

        assert!(matches!(rx_a.try_recv(), Ok(Frame::Text(_))));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn joining_a_room_twice_subscribes_once() {
        let registry = ConnectionRegistry::new();
        let room = SessionId::generate();
        let identity = ConnectionId::new();

        let mut rx = registry.register(identity).await;
        registry.join_room(&room, identity).await;
        registry.join_room(&room, identity).await;

        registry.send_to_session(&room, chat(&room)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_removes_connection_from_rooms() {
        let registry = ConnectionRegistry::new();
        let room = SessionId::generate();
        let identity = ConnectionId::new();

        let _rx = registry.register(identity).await;
        registry.join_room(&room, identity).await;
        assert_eq!(registry.room_size(&room).await, 1);

        registry.unregister(identity).await;
        assert_eq!(registry.room_size(&room).await, 0);
    }

    #[tokio::test]
    async fn dead_senders_are_dropped_on_broadcast() {
        let registry = ConnectionRegistry::new();
        let room = SessionId::generate();
        let identity = ConnectionId::new();

        let rx = registry.register(identity).await;
        registry.join_room(&room, identity).await;
        drop(rx);

        registry.send_to_session(&room, chat(&room)).await;
        assert_eq!(registry.room_size(&room).await, 0);
    }
}
