//! Registry of live sessions.
//!
//! `SessionRegistry` stores non-owning weak references to sessions so that
//! tracking a session never keeps it alive. Dead entries can be pruned
//! opportunistically or lazily at lookup time.

use std::sync::Weak;

use dashmap::DashMap;

use super::{SessionId, SessionInner, TcpSession};

/// Concurrent registry of sessions keyed by [`SessionId`].
#[derive(Default)]
pub struct SessionRegistry(DashMap<SessionId, Weak<SessionInner>>);

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Retrieve the session for `id` if it is still alive.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<TcpSession> {
        let guard = self.0.get(&id);
        let inner = guard.as_ref().and_then(|weak| weak.upgrade());
        drop(guard);
        if inner.is_none() {
            self.0.remove_if(&id, |_, weak| weak.strong_count() == 0);
        }
        inner.map(TcpSession::from_inner)
    }

    /// Track a session.
    pub fn insert(&self, session: &TcpSession) { self.0.insert(session.id(), session.downgrade()); }

    /// Stop tracking a session.
    pub fn remove(&self, id: SessionId) { self.0.remove(&id); }

    /// Remove entries whose session has been dropped.
    ///
    /// `DashMap::retain` acquires per-bucket write locks, so other operations
    /// may contend briefly while the registry is pruned.
    pub fn prune(&self) { self.0.retain(|_, weak| weak.strong_count() > 0); }

    /// Prune dropped sessions, then collect the remaining live ones.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<TcpSession> {
        let mut sessions = Vec::with_capacity(self.0.len());
        self.0.retain(|_, weak| {
            if let Some(inner) = weak.upgrade() {
                sessions.push(TcpSession::from_inner(inner));
                true
            } else {
                false
            }
        });
        sessions
    }

    /// Number of tracked entries, including dropped sessions not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether the registry tracks no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
