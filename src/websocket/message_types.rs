use serde::Deserialize;

use crate::session::{SessionId, VoteKind};

/// Inbound websocket events from client to server.
///
/// Media chunks arrive as binary frames, not as JSON events; a binary
/// frame is relayed to the session the sending connection published.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    /// Publisher opens a new broadcast session. The generated session id
    /// is answered on this connection only.
    #[serde(rename = "start-session")]
    StartSession,

    #[serde(rename = "join-session")]
    JoinSession { session_id: SessionId },

    #[serde(rename = "chat-message")]
    ChatMessage {
        session_id: SessionId,
        author: String,
        text: String,
    },

    #[serde(rename = "cast-vote")]
    CastVote {
        session_id: SessionId,
        kind: VoteKind,
    },
}

impl WsInboundEvent {
    /// Label used for the per-event metrics counter.
    pub fn label(&self) -> &'static str {
        match self {
            WsInboundEvent::StartSession => "start-session",
            WsInboundEvent::JoinSession { .. } => "join-session",
            WsInboundEvent::ChatMessage { .. } => "chat-message",
            WsInboundEvent::CastVote { .. } => "cast-vote",
        }
    }
}
