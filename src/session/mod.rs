use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod coordinator;
pub mod events;
pub mod identity;
pub mod registry;

pub use coordinator::{BroadcastGateway, SessionCoordinator};
pub use events::{Broadcast, SessionEvent};
pub use identity::{IdentityRegistry, VoteKind, VoteState};
pub use registry::{SessionRegistry, SessionSnapshot};

/// Opaque session identifier: 16 lowercase hex characters.
///
/// URL-safe and usable as a room key. Generated from a secure random
/// source; collisions are detected by the registry and retried.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let mut raw = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut raw);
        Self(hex::encode(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable handle for one live connection, assigned by the transport layer
/// when the socket is accepted. Never persisted beyond the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Chat message relayed verbatim to a session room, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
}
