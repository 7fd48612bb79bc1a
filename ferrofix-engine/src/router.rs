/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Application message routing.
//!
//! Routes verified application messages to user handlers keyed on
//! `(BeginString, MsgType)`. Messages with no registered route answer with
//! an UnsupportedMessageType business reject, which the session turns into
//! a BusinessMessageReject (j).

use ferrofix_core::error::{MessageRejectError, RejectReason};
use ferrofix_core::message::Message;
use ferrofix_core::tags;
use ferrofix_core::types::SessionId;
use std::collections::HashMap;

/// Handler invoked for one routed message type.
pub type RouteHandler =
    Box<dyn Fn(&Message, &SessionId) -> Result<(), MessageRejectError> + Send + Sync>;

/// Dispatches application messages by `(BeginString, MsgType)`.
#[derive(Default)]
pub struct MessageRouter {
    routes: HashMap<(String, String), RouteHandler>,
}

impl MessageRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one message type of one FIX version.
    ///
    /// # Arguments
    /// * `begin_string` - The FIX version the route applies to
    /// * `msg_type` - The wire MsgType value (e.g. "D")
    /// * `handler` - The handler to invoke
    pub fn add_route(
        &mut self,
        begin_string: impl Into<String>,
        msg_type: impl Into<String>,
        handler: RouteHandler,
    ) {
        self.routes
            .insert((begin_string.into(), msg_type.into()), handler);
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes one message.
    ///
    /// # Errors
    /// Returns the handler's reject, or UnsupportedMessageType when no
    /// route matches.
    pub fn route(&self, message: &Message, session_id: &SessionId) -> Result<(), MessageRejectError> {
        let begin_string = message
            .begin_string()
            .ok_or_else(|| MessageRejectError::required_tag_missing(tags::BEGIN_STRING))?;
        let msg_type = message
            .header
            .get_str(tags::MSG_TYPE)
            .ok_or_else(|| MessageRejectError::required_tag_missing(tags::MSG_TYPE))?;

        match self
            .routes
            .get(&(begin_string.to_string(), msg_type.to_string()))
        {
            Some(handler) => handler(message, session_id),
            None => Err(MessageRejectError::new(
                RejectReason::UnsupportedMessageType,
                format!("unsupported message type: {msg_type}"),
            )
            .with_ref_msg_type(msg_type)),
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}
