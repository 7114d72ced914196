use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use super::{ConnectionId, SessionId};

/// One live broadcast session.
///
/// `viewer_count` is always derived from the members set, so membership
/// counts can never go stale. Tallies never go below zero.
#[derive(Debug, Default)]
struct Session {
    members: HashSet<ConnectionId>,
    like_count: u64,
    dislike_count: u64,
}

/// Read-only view of a session's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub viewer_count: usize,
    pub like_count: u64,
    pub dislike_count: u64,
}

/// Owns all `Session` entities, addressed by id.
///
/// The coordinator is the only mutator. Empty sessions are retained;
/// counts stay correct because they are derived from the members set.
#[derive(Default, Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session with all counters at zero and return its id.
    ///
    /// An id collision is astronomically unlikely but detected and retried.
    pub async fn create_session(&self) -> SessionId {
        let mut guard = self.inner.write().await;
        loop {
            let id = SessionId::generate();
            if guard.contains_key(&id) {
                tracing::warn!(session_id = %id, "session id collision, regenerating");
                continue;
            }
            guard.insert(id.clone(), Session::default());
            return id;
        }
    }

    pub async fn lookup(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        let guard = self.inner.read().await;
        guard.get(session_id).map(|session| SessionSnapshot {
            session_id: session_id.clone(),
            viewer_count: session.members.len(),
            like_count: session.like_count,
            dislike_count: session.dislike_count,
        })
    }

    /// Add `identity` to the session's members. Idempotent: rejoining does
    /// not double count. Returns the viewer count, or `None` for an
    /// unknown session.
    pub async fn join(&self, session_id: &SessionId, identity: ConnectionId) -> Option<usize> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(session_id)?;
        session.members.insert(identity);
        Some(session.members.len())
    }

    /// Remove `identity` from the session's members. Idempotent no-op when
    /// absent. Returns the remaining viewer count, or `None` for an
    /// unknown session.
    pub async fn leave(&self, session_id: &SessionId, identity: ConnectionId) -> Option<usize> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(session_id)?;
        session.members.remove(&identity);
        Some(session.members.len())
    }

    pub async fn is_member(&self, session_id: &SessionId, identity: ConnectionId) -> bool {
        let guard = self.inner.read().await;
        guard
            .get(session_id)
            .map(|session| session.members.contains(&identity))
            .unwrap_or(false)
    }

    /// Sessions `identity` is currently a member of.
    ///
    /// Walks the whole session map; acceptable while the per-process
    /// session count stays small.
    pub async fn sessions_of(&self, identity: ConnectionId) -> Vec<SessionId> {
        let guard = self.inner.read().await;
        guard
            .iter()
            .filter(|(_, session)| session.members.contains(&identity))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Apply like/dislike deltas to a session's tallies, clamping at zero.
    /// Returns the updated counts, or `None` for an unknown session.
    pub async fn adjust_tally(
        &self,
        session_id: &SessionId,
        like_delta: i64,
        dislike_delta: i64,
    ) -> Option<(u64, u64)> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(session_id)?;
        session.like_count = session.like_count.saturating_add_signed(like_delta);
        session.dislike_count = session.dislike_count.saturating_add_signed(dislike_delta);
        Some((session.like_count, session.dislike_count))
    }
}
