//! Process-wide set of live client sessions.

use crate::session::client::SessionHandle;
use dashmap::DashMap;
use uuid::Uuid;

/// Live sessions keyed by session id.
///
/// Holds only producer handles; the connection handler owns each queue.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Add a session to the live set
    pub fn register(&self, session: SessionHandle) {
        self.sessions.insert(session.id(), session);
    }

    /// Remove a session. Returns false if it was already gone.
    pub fn unregister(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Visit every session registered at the time of the call.
    ///
    /// `f` must not register or unregister sessions itself.
    pub fn for_each(&self, mut f: impl FnMut(&SessionHandle)) {
        for entry in self.sessions.iter() {
            f(entry.value());
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
