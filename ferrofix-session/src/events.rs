/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Timer events delivered to the session state machine.

use std::fmt;

/// A timer expiry routed through the session's event loop.
///
/// Timers never call into the state machine directly; the clock sweep turns
/// deadlines into these events and the actor feeds them to the current
/// state's timeout handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Nothing received within 1.2 × HeartBtInt.
    PeerTimeout,
    /// Nothing sent within HeartBtInt.
    NeedHeartbeat,
    /// No Logon response within LogonTimeout.
    LogonTimeout,
    /// No Logout reply within LogoutTimeout.
    LogoutTimeout,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PeerTimeout => "peer timeout",
            Self::NeedHeartbeat => "need heartbeat",
            Self::LogonTimeout => "logon timeout",
            Self::LogoutTimeout => "logout timeout",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(Event::PeerTimeout.to_string(), "peer timeout");
        assert_eq!(Event::NeedHeartbeat.to_string(), "need heartbeat");
    }
}
