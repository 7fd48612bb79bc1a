/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session registry.
//!
//! Maps [`SessionId`] to the handle of its running actor. Insert and remove
//! take the write lock; dispatch-time lookups take the read lock. The
//! registry is stable after engine start.

use ferrofix_core::types::SessionId;
use ferrofix_session::SessionHandle;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Registry of running sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session handle under its identity.
    ///
    /// # Returns
    /// The previous handle if the identity was already registered.
    pub fn register(&self, handle: SessionHandle) -> Option<SessionHandle> {
        self.sessions.write().insert(handle.id().clone(), handle)
    }

    /// Removes a session.
    pub fn deregister(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.write().remove(id)
    }

    /// Looks up a session by exact identity.
    #[must_use]
    pub fn lookup(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().get(id).cloned()
    }

    /// Acceptor-side lookup: matches an inbound Logon by its wire CompIDs.
    ///
    /// The counterparty's SenderCompID is our TargetCompID and vice versa,
    /// so the match runs against the reversed pair.
    #[must_use]
    pub fn lookup_for_logon(
        &self,
        begin_string: &str,
        wire_sender: &str,
        wire_target: &str,
    ) -> Option<SessionHandle> {
        let sessions = self.sessions.read();
        sessions
            .iter()
            .find(|(id, _)| {
                id.begin_string == begin_string
                    && id.sender_comp_id.as_str() == wire_target
                    && id.target_comp_id.as_str() == wire_sender
            })
            .map(|(_, handle)| handle.clone())
    }

    /// Returns every registered session handle, for initiator reconnect
    /// sweeps.
    #[must_use]
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.read().values().cloned().collect()
    }

    /// Returns the registered identities.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Returns the number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_core::types::CompId;
    use ferrofix_session::{NoOpApplication, NullLog, Session, SessionConfig};
    use ferrofix_store::MemoryStore;
    use std::sync::Arc;

    fn make_handle(begin: &str, sender: &str, target: &str) -> SessionHandle {
        let id = SessionId::new(
            begin,
            CompId::new(sender).unwrap(),
            CompId::new(target).unwrap(),
        );
        let (_session, handle) = Session::new(
            SessionConfig::new(id),
            Arc::new(MemoryStore::new()),
            Arc::new(NoOpApplication),
            Arc::new(NullLog),
        )
        .unwrap();
        handle
    }

    #[test]
    fn register_and_lookup() {
        let registry = SessionRegistry::new();
        let handle = make_handle("FIX.4.4", "BANK", "EXCH");
        let id = handle.id().clone();

        assert!(registry.register(handle).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&id).is_some());

        registry.deregister(&id);
        assert!(registry.is_empty());
    }

    #[test]
    fn logon_lookup_reverses_comp_ids() {
        let registry = SessionRegistry::new();
        registry.register(make_handle("FIX.4.4", "BANK", "EXCH"));
        registry.register(make_handle("FIX.4.2", "BANK", "MKT"));

        // Inbound Logon from EXCH arrives with 49=EXCH, 56=BANK.
        let found = registry.lookup_for_logon("FIX.4.4", "EXCH", "BANK");
        assert_eq!(found.unwrap().id().target_comp_id.as_str(), "EXCH");

        // Version must match too.
        assert!(registry.lookup_for_logon("FIX.4.2", "EXCH", "BANK").is_none());
        // Unknown counterparty.
        assert!(registry.lookup_for_logon("FIX.4.4", "GHOST", "BANK").is_none());
    }

    #[test]
    fn duplicate_registration_returns_previous() {
        let registry = SessionRegistry::new();
        registry.register(make_handle("FIX.4.4", "BANK", "EXCH"));
        let previous = registry.register(make_handle("FIX.4.4", "BANK", "EXCH"));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }
}
