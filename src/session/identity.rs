use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{ConnectionId, SessionId};

/// Which way a viewer voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

/// Vote recorded for one connection identity.
///
/// A connection holds at most one vote, scoped to exactly one session.
/// Casting in a different session than the recorded one does not retract
/// the old session's tally (see the coordinator's decision table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    Liked(SessionId),
    Disliked(SessionId),
}

/// Global connection-identity → vote map, shared across all sessions.
///
/// Plain key-value mutations; the coordinator is the only mutator and
/// serializes read-modify-write cycles around it.
#[derive(Default, Clone)]
pub struct IdentityRegistry {
    inner: Arc<RwLock<HashMap<ConnectionId, VoteState>>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_vote(&self, identity: ConnectionId) -> VoteState {
        let guard = self.inner.read().await;
        guard.get(&identity).cloned().unwrap_or(VoteState::NoVote)
    }

    pub async fn set_vote(&self, identity: ConnectionId, state: VoteState) {
        let mut guard = self.inner.write().await;
        match state {
            VoteState::NoVote => {
                guard.remove(&identity);
            }
            other => {
                guard.insert(identity, other);
            }
        }
    }

    pub async fn clear_vote(&self, identity: ConnectionId) {
        let mut guard = self.inner.write().await;
        guard.remove(&identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_identity_reads_as_no_vote() {
        let registry = IdentityRegistry::new();
        assert_eq!(
            registry.get_vote(ConnectionId::new()).await,
            VoteState::NoVote
        );
    }

    #[tokio::test]
    async fn set_and_clear_round_trip() {
        let registry = IdentityRegistry::new();
        let identity = ConnectionId::new();
        let session = SessionId::generate();

        registry
            .set_vote(identity, VoteState::Liked(session.clone()))
            .await;
        assert_eq!(registry.get_vote(identity).await, VoteState::Liked(session));

        registry.clear_vote(identity).await;
        assert_eq!(registry.get_vote(identity).await, VoteState::NoVote);
    }

    #[tokio::test]
    async fn setting_no_vote_clears_the_entry() {
        let registry = IdentityRegistry::new();
        let identity = ConnectionId::new();

        registry
            .set_vote(identity, VoteState::Disliked(SessionId::generate()))
            .await;
        registry.set_vote(identity, VoteState::NoVote).await;
        assert_eq!(registry.get_vote(identity).await, VoteState::NoVote);
    }
}
