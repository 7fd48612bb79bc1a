/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session event and message logging.
//!
//! The session core logs through this interface only; where the records go
//! (tracing, files, nothing) is the caller's choice. Implementations must
//! tolerate being called from the session actor at any point in the
//! lifecycle.

use ferrofix_core::types::SessionId;

/// Sink for session events and raw message traffic.
pub trait SessionLog: Send + Sync {
    /// Records a raw inbound message.
    fn on_incoming(&self, bytes: &[u8]);

    /// Records a raw outbound message.
    fn on_outgoing(&self, bytes: &[u8]);

    /// Records a session event (state change, error, admin action).
    fn on_event(&self, event: &str);
}

/// Logger that forwards to the `tracing` subscriber.
#[derive(Debug)]
pub struct TracingLog {
    session: String,
}

impl TracingLog {
    /// Creates a tracing-backed log for the given session.
    #[must_use]
    pub fn new(session_id: &SessionId) -> Self {
        Self {
            session: session_id.to_string(),
        }
    }
}

impl SessionLog for TracingLog {
    fn on_incoming(&self, bytes: &[u8]) {
        tracing::debug!(
            target: "ferrofix::messages",
            session = %self.session,
            direction = "in",
            message = %String::from_utf8_lossy(bytes),
        );
    }

    fn on_outgoing(&self, bytes: &[u8]) {
        tracing::debug!(
            target: "ferrofix::messages",
            session = %self.session,
            direction = "out",
            message = %String::from_utf8_lossy(bytes),
        );
    }

    fn on_event(&self, event: &str) {
        tracing::info!(target: "ferrofix::events", session = %self.session, event);
    }
}

/// Logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl SessionLog for NullLog {
    fn on_incoming(&self, _bytes: &[u8]) {}

    fn on_outgoing(&self, _bytes: &[u8]) {}

    fn on_event(&self, _event: &str) {}
}
