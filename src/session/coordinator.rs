use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::events::{Broadcast, SessionEvent};
use super::identity::{IdentityRegistry, VoteKind, VoteState};
use super::registry::SessionRegistry;
use super::{ChatMessage, ConnectionId, SessionId};

/// The only component allowed to push bytes to connections.
///
/// Sends are best-effort: the coordinator never retries and never inspects
/// delivery results. The websocket `ConnectionRegistry` is the production
/// implementation; tests substitute capturing mocks.
#[async_trait]
pub trait BroadcastGateway: Send + Sync {
    async fn send_to_session(&self, session_id: &SessionId, payload: Broadcast);
    async fn send_to_connection(&self, identity: ConnectionId, payload: Broadcast);
}

/// Façade invoked by the transport layer on every inbound event.
///
/// Holds no session state of its own: it always resolves through the
/// registries and instructs the gateway which room receives which payload.
/// Every anomaly (unknown session, vote from a non-member) is absorbed as
/// a silent no-op; the realtime transport has no response channel to
/// surface errors on.
pub struct SessionCoordinator {
    sessions: SessionRegistry,
    votes: IdentityRegistry,
    gateway: Arc<dyn BroadcastGateway>,
    // Serializes every mutating operation, including its broadcasts, so
    // concurrent votes/joins/disconnects never interleave mid-operation
    // and per-session broadcast order matches acceptance order.
    op_lock: Mutex<()>,
}

impl SessionCoordinator {
    pub fn new(
        sessions: SessionRegistry,
        votes: IdentityRegistry,
        gateway: Arc<dyn BroadcastGateway>,
    ) -> Self {
        Self {
            sessions,
            votes,
            gateway,
            op_lock: Mutex::new(()),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Create a session for a publisher. The id is returned to the caller
    /// only, never broadcast.
    pub async fn start_session(&self, publisher: ConnectionId) -> SessionId {
        let _guard = self.op_lock.lock().await;
        let session_id = self.sessions.create_session().await;
        tracing::info!(%session_id, %publisher, "session started");
        session_id
    }

    /// Add `identity` to the session and announce the updated viewer count
    /// to every current member, including the joiner. `None` for an
    /// unknown session.
    pub async fn join_session(
        &self,
        session_id: &SessionId,
        identity: ConnectionId,
    ) -> Option<usize> {
        let _guard = self.op_lock.lock().await;
        let viewer_count = self.sessions.join(session_id, identity).await?;
        tracing::debug!(%session_id, %identity, viewer_count, "viewer joined");
        self.gateway
            .send_to_session(
                session_id,
                Broadcast::Event(SessionEvent::ViewerCount {
                    session_id: session_id.clone(),
                    viewer_count,
                }),
            )
            .await;
        Some(viewer_count)
    }

    /// Relay a chat message verbatim to the session room. Broadcasting to
    /// an unknown or empty room is a silent no-op.
    pub async fn chat_message(&self, session_id: &SessionId, message: ChatMessage) {
        let _guard = self.op_lock.lock().await;
        self.gateway
            .send_to_session(
                session_id,
                Broadcast::Event(SessionEvent::chat(session_id.clone(), message)),
            )
            .await;
    }

    /// Relay a media chunk verbatim to the session room. The payload is
    /// never inspected or buffered beyond this single call.
    pub async fn relay_media_chunk(&self, session_id: &SessionId, chunk: Bytes) {
        let _guard = self.op_lock.lock().await;
        self.gateway
            .send_to_session(session_id, Broadcast::Chunk(chunk))
            .await;
    }

    /// Apply one like/dislike vote and broadcast the updated tally.
    ///
    /// Idempotent per identity: repeating the same kind changes nothing,
    /// switching kinds moves one count across. A vote recorded for a
    /// *different* session is treated as no prior vote here and the old
    /// session's tally is deliberately left untouched. Votes from
    /// identities that are not members of the target session are ignored,
    /// which also discards late votes arriving after a disconnect.
    pub async fn cast_vote(
        &self,
        session_id: &SessionId,
        identity: ConnectionId,
        kind: VoteKind,
    ) -> Option<(u64, u64)> {
        let _guard = self.op_lock.lock().await;
        if !self.sessions.is_member(session_id, identity).await {
            tracing::debug!(%session_id, %identity, "vote from non-member ignored");
            return None;
        }

        let previous = self.votes.get_vote(identity).await;
        let (like_delta, dislike_delta, next) = match (&previous, kind) {
            (VoteState::Liked(s), VoteKind::Like) if s == session_id => {
                (0, 0, VoteState::Liked(session_id.clone()))
            }
            (VoteState::Disliked(s), VoteKind::Dislike) if s == session_id => {
                (0, 0, VoteState::Disliked(session_id.clone()))
            }
            (VoteState::Liked(s), VoteKind::Dislike) if s == session_id => {
                (-1, 1, VoteState::Disliked(session_id.clone()))
            }
            (VoteState::Disliked(s), VoteKind::Like) if s == session_id => {
                (1, -1, VoteState::Liked(session_id.clone()))
            }
            // No prior vote, or a vote recorded for another session: the
            // other session's tally is not retracted.
            (_, VoteKind::Like) => (1, 0, VoteState::Liked(session_id.clone())),
            (_, VoteKind::Dislike) => (0, 1, VoteState::Disliked(session_id.clone())),
        };

        let (like_count, dislike_count) = self
            .sessions
            .adjust_tally(session_id, like_delta, dislike_delta)
            .await?;
        self.votes.set_vote(identity, next).await;

        self.gateway
            .send_to_session(
                session_id,
                Broadcast::Event(SessionEvent::VoteTally {
                    session_id: session_id.clone(),
                    like_count,
                    dislike_count,
                }),
            )
            .await;
        Some((like_count, dislike_count))
    }

    /// Terminal operation for an identity: drop its memberships, retract
    /// the vote scoped to each of those sessions, and announce the updated
    /// counts to the remaining members.
    pub async fn disconnect(&self, identity: ConnectionId) {
        let _guard = self.op_lock.lock().await;
        for session_id in self.sessions.sessions_of(identity).await {
            if let Some(viewer_count) = self.sessions.leave(&session_id, identity).await {
                self.gateway
                    .send_to_session(
                        &session_id,
                        Broadcast::Event(SessionEvent::ViewerCount {
                            session_id: session_id.clone(),
                            viewer_count,
                        }),
                    )
                    .await;
            }

            let retract = match self.votes.get_vote(identity).await {
                VoteState::Liked(s) if s == session_id => Some((-1, 0)),
                VoteState::Disliked(s) if s == session_id => Some((0, -1)),
                _ => None,
            };
            if let Some((like_delta, dislike_delta)) = retract {
                if let Some((like_count, dislike_count)) = self
                    .sessions
                    .adjust_tally(&session_id, like_delta, dislike_delta)
                    .await
                {
                    self.votes.clear_vote(identity).await;
                    self.gateway
                        .send_to_session(
                            &session_id,
                            Broadcast::Event(SessionEvent::VoteTally {
                                session_id: session_id.clone(),
                                like_count,
                                dislike_count,
                            }),
                        )
                        .await;
                }
            }
        }

        // The identity never comes back; drop any stale cross-session vote.
        self.votes.clear_vote(identity).await;
        tracing::info!(%identity, "connection cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullGateway;

    #[async_trait]
    impl BroadcastGateway for NullGateway {
        async fn send_to_session(&self, _session_id: &SessionId, _payload: Broadcast) {}
        async fn send_to_connection(&self, _identity: ConnectionId, _payload: Broadcast) {}
    }

    fn coordinator() -> SessionCoordinator {
        SessionCoordinator::new(
            SessionRegistry::new(),
            IdentityRegistry::new(),
            Arc::new(NullGateway),
        )
    }

    async fn join(coordinator: &SessionCoordinator, identity: ConnectionId) -> SessionId {
        let session_id = coordinator.start_session(ConnectionId::new()).await;
        coordinator.join_session(&session_id, identity).await;
        session_id
    }

    #[tokio::test]
    async fn repeated_votes_of_same_kind_are_idempotent() {
        let coordinator = coordinator();
        let viewer = ConnectionId::new();
        let session = join(&coordinator, viewer).await;

        assert_eq!(
            coordinator.cast_vote(&session, viewer, VoteKind::Like).await,
            Some((1, 0))
        );
        assert_eq!(
            coordinator.cast_vote(&session, viewer, VoteKind::Like).await,
            Some((1, 0))
        );
    }

    #[tokio::test]
    async fn switching_vote_moves_one_count() {
        let coordinator = coordinator();
        let viewer = ConnectionId::new();
        let session = join(&coordinator, viewer).await;

        coordinator.cast_vote(&session, viewer, VoteKind::Like).await;
        assert_eq!(
            coordinator
                .cast_vote(&session, viewer, VoteKind::Dislike)
                .await,
            Some((0, 1))
        );
        assert_eq!(
            coordinator.cast_vote(&session, viewer, VoteKind::Like).await,
            Some((1, 0))
        );
    }

    #[tokio::test]
    async fn vote_in_second_session_does_not_retract_the_first() {
        let coordinator = coordinator();
        let viewer = ConnectionId::new();
        let first = join(&coordinator, viewer).await;
        let second = coordinator.start_session(ConnectionId::new()).await;
        coordinator.join_session(&second, viewer).await;

        coordinator.cast_vote(&first, viewer, VoteKind::Like).await;
        assert_eq!(
            coordinator.cast_vote(&second, viewer, VoteKind::Like).await,
            Some((1, 0))
        );

        // Known carried-over inconsistency: the first session keeps its like.
        let stale = coordinator.sessions().lookup(&first).await.unwrap();
        assert_eq!(stale.like_count, 1);
    }

    #[tokio::test]
    async fn vote_from_non_member_is_ignored() {
        let coordinator = coordinator();
        let session = coordinator.start_session(ConnectionId::new()).await;

        let outcome = coordinator
            .cast_vote(&session, ConnectionId::new(), VoteKind::Like)
            .await;
        assert_eq!(outcome, None);

        let snapshot = coordinator.sessions().lookup(&session).await.unwrap();
        assert_eq!(snapshot.like_count, 0);
        assert_eq!(snapshot.dislike_count, 0);
    }

    #[tokio::test]
    async fn vote_on_unknown_session_is_ignored() {
        let coordinator = coordinator();
        let outcome = coordinator
            .cast_vote(&SessionId::generate(), ConnectionId::new(), VoteKind::Like)
            .await;
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn disconnect_retracts_membership_and_vote() {
        let coordinator = coordinator();
        let viewer = ConnectionId::new();
        let session = join(&coordinator, viewer).await;
        coordinator
            .cast_vote(&session, viewer, VoteKind::Dislike)
            .await;

        coordinator.disconnect(viewer).await;

        let snapshot = coordinator.sessions().lookup(&session).await.unwrap();
        assert_eq!(snapshot.viewer_count, 0);
        assert_eq!(snapshot.like_count, 0);
        assert_eq!(snapshot.dislike_count, 0);
    }

    #[tokio::test]
    async fn late_vote_after_disconnect_is_rejected() {
        let coordinator = coordinator();
        let viewer = ConnectionId::new();
        let session = join(&coordinator, viewer).await;

        coordinator.disconnect(viewer).await;
        assert_eq!(
            coordinator.cast_vote(&session, viewer, VoteKind::Like).await,
            None
        );
    }
}
