/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application callback interface.
//!
//! The session core yields to user code only through this trait. Callbacks
//! run inside the session actor, outside any lock; implementations may take
//! arbitrarily long without corrupting session state, though they delay that
//! session's event processing.

use async_trait::async_trait;
use ferrofix_core::error::MessageRejectError;
use ferrofix_core::message::Message;
use ferrofix_core::types::SessionId;

/// Returned by [`Application::to_app`] to veto an outbound message.
///
/// The message is dropped before a sequence number is allocated; nothing
/// reaches the store or the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoNotSend;

/// Callbacks the session core invokes on session events and message
/// traffic. All methods have no-op defaults.
#[async_trait]
pub trait Application: Send + Sync {
    /// Called once when the session is created.
    async fn on_create(&self, _session_id: &SessionId) {}

    /// Called when the session completes a logon exchange.
    async fn on_logon(&self, _session_id: &SessionId) {}

    /// Called when the session logs out or the connection drops while
    /// logged on.
    async fn on_logout(&self, _session_id: &SessionId) {}

    /// Called before an administrative message is sent; the message may be
    /// modified in place (e.g. to add credentials to a Logon).
    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    /// Called for every inbound administrative message.
    ///
    /// # Errors
    /// Returning a reject answers the message with a session-level Reject.
    async fn from_admin(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), MessageRejectError> {
        Ok(())
    }

    /// Called before an application message is sent; the message may be
    /// modified in place.
    ///
    /// # Errors
    /// Returning [`DoNotSend`] drops the message.
    async fn to_app(
        &self,
        _message: &mut Message,
        _session_id: &SessionId,
    ) -> Result<(), DoNotSend> {
        Ok(())
    }

    /// Called for every inbound application message.
    ///
    /// # Errors
    /// Returning a reject answers the message with a session-level Reject
    /// or BusinessMessageReject.
    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), MessageRejectError> {
        Ok(())
    }
}

/// An application that accepts everything and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpApplication;

#[async_trait]
impl Application for NoOpApplication {}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_core::types::CompId;

    #[tokio::test]
    async fn noop_application_accepts_everything() {
        let app = NoOpApplication;
        let id = SessionId::new(
            "FIX.4.4",
            CompId::new("BANK").unwrap(),
            CompId::new("EXCH").unwrap(),
        );
        app.on_create(&id).await;
        app.on_logon(&id).await;
        app.on_logout(&id).await;

        let msg = Message::new();
        assert!(app.from_admin(&msg, &id).await.is_ok());
        assert!(app.from_app(&msg, &id).await.is_ok());

        let mut out = Message::new();
        app.to_admin(&mut out, &id).await;
        assert!(app.to_app(&mut out, &id).await.is_ok());
    }
}
