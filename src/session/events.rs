use bytes::Bytes;
use serde::Serialize;

use super::{ChatMessage, SessionId};

/// Outbound events pushed to session rooms and individual connections.
///
/// Serialized as tagged JSON on the wire, mirroring the inbound event
/// vocabulary handled by the transport adapter.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Sent to the publisher connection only, never broadcast.
    #[serde(rename = "session-started")]
    SessionStarted { session_id: SessionId },

    #[serde(rename = "viewer-count")]
    ViewerCount {
        session_id: SessionId,
        viewer_count: usize,
    },

    #[serde(rename = "chat-message")]
    Chat {
        session_id: SessionId,
        author: String,
        text: String,
    },

    #[serde(rename = "vote-tally")]
    VoteTally {
        session_id: SessionId,
        like_count: u64,
        dislike_count: u64,
    },
}

impl SessionEvent {
    pub fn chat(session_id: SessionId, message: ChatMessage) -> Self {
        Self::Chat {
            session_id,
            author: message.author,
            text: message.text,
        }
    }
}

/// One payload handed to the broadcast gateway: either a JSON event or a
/// raw media chunk relayed as a binary frame.
#[derive(Debug, Clone)]
pub enum Broadcast {
    Event(SessionEvent),
    Chunk(Bytes),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SessionEvent::VoteTally {
            session_id: SessionId::generate(),
            like_count: 3,
            dislike_count: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "vote-tally");
        assert_eq!(json["like_count"], 3);
        assert_eq!(json["dislike_count"], 1);
    }
}
