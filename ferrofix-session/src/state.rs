/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session states.
//!
//! States are cheap tokens; transition means replacing the current token.
//! The `Resend` state alone carries data: the stash of out-of-order
//! messages held back until the gap fills, and the upper bound of the
//! requested range.
//!
//! The per-state message/timeout/stop handlers live in the session module,
//! where they can reach the session's store, clock, and transport; this
//! module owns the state tokens and the three predicates every state
//! answers.

use ferrofix_core::message::Message;
use std::collections::BTreeMap;
use std::fmt;

/// Out-of-order messages parked while a gap is being filled.
#[derive(Debug, Default)]
pub struct ResendInfo {
    /// Messages received ahead of the expected sequence number, by seq.
    pub stash: BTreeMap<u64, Message>,
    /// Highest sequence number known to be outstanding; the resend is
    /// complete once the expected counter moves past it and the stash is
    /// drained.
    pub range_end: u64,
}

/// The session lifecycle states.
#[derive(Debug, Default)]
pub enum SessionState {
    /// Not in active communication; accepting start/stop signals.
    #[default]
    Latent,
    /// Outside the configured session-time window; all I/O suppressed.
    NotSessionTime,
    /// Connected, awaiting a Logon (acceptor) or a Logon response
    /// (initiator).
    LogonPending,
    /// Logged on, normal operation.
    InSession,
    /// Logged on, filling an inbound sequence gap.
    Resend(ResendInfo),
    /// Logged on, TestRequest outstanding after a missed heartbeat.
    PendingTimeout,
    /// Logout sent, awaiting the counterparty's reply.
    LogoutPending,
}

impl SessionState {
    /// True while a logon exchange has completed and no logout is pending.
    #[must_use]
    pub const fn is_logged_on(&self) -> bool {
        matches!(
            self,
            Self::InSession | Self::Resend(_) | Self::PendingTimeout
        )
    }

    /// True while a transport connection is attached.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::LogonPending
                | Self::InSession
                | Self::Resend(_)
                | Self::PendingTimeout
                | Self::LogoutPending
        )
    }

    /// True while inside the configured session-time window.
    #[must_use]
    pub const fn is_session_time(&self) -> bool {
        !matches!(self, Self::NotSessionTime)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latent => "Latent state",
            Self::NotSessionTime => "Not session time",
            Self::LogonPending => "Logon state",
            Self::InSession => "In session",
            Self::Resend(_) => "Resend",
            Self::PendingTimeout => "Pending timeout",
            Self::LogoutPending => "Logout state",
        };
        write!(f, "{name}")
    }
}
