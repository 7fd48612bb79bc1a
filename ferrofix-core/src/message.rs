/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The tri-partitioned FIX message and its type alphabet.
//!
//! A [`Message`] is a tagged field map decomposed into three ordered
//! sub-maps: header, body, and trailer. Fields within each sub-map keep
//! insertion order; the encoder iterates them in a canonical serialization
//! order (see `ferrofix-codec`). An inbound message additionally carries its
//! `receive_time`.
//!
//! BodyLength (9) and CheckSum (10) are derived fields: the decoder
//! validates them against the wire bytes and drops them, and the encoder
//! recomputes them on the way out. They never live in the sub-maps.

use crate::error::DecodeError;
use crate::field::FieldMap;
use crate::tags;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session-layer message types, with a catch-all for application types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    /// Heartbeat (0).
    Heartbeat,
    /// Test Request (1).
    TestRequest,
    /// Resend Request (2).
    ResendRequest,
    /// Reject (3).
    Reject,
    /// Sequence Reset (4), plain or gap-fill.
    SequenceReset,
    /// Logout (5).
    Logout,
    /// Logon (A).
    Logon,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Any application-level message type.
    Other(String),
}

impl MsgType {
    /// Returns the wire representation of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::BusinessMessageReject => "j",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Returns true for the administrative (session-level) alphabet:
    /// Heartbeat, TestRequest, ResendRequest, Reject, SequenceReset,
    /// Logout, Logon.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// Returns true for application-level types (everything outside the
    /// admin alphabet, BusinessMessageReject included).
    #[must_use]
    pub const fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl FromStr for MsgType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            "j" => Self::BusinessMessageReject,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A FIX message as three ordered field maps plus receive metadata.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Standard header fields (BeginString, CompIDs, MsgSeqNum, ...).
    pub header: FieldMap,
    /// Message body.
    pub body: FieldMap,
    /// Standard trailer fields (signature; CheckSum is derived).
    pub trailer: FieldMap,
    /// Instant the message was read off the transport, for inbound messages.
    pub receive_time: Option<Timestamp>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message with MsgType set, the starting point for every
    /// outbound message.
    ///
    /// # Arguments
    /// * `msg_type` - The message type to stamp into the header
    #[must_use]
    pub fn of_type(msg_type: &MsgType) -> Self {
        let mut msg = Self::default();
        msg.header.set_str(tags::MSG_TYPE, msg_type.as_str());
        msg
    }

    /// Returns the message type from the header.
    ///
    /// # Errors
    /// Returns `DecodeError::MissingField` if tag 35 is absent.
    pub fn msg_type(&self) -> Result<MsgType, DecodeError> {
        let s = self
            .header
            .get_str(tags::MSG_TYPE)
            .ok_or(DecodeError::MissingField {
                tag: tags::MSG_TYPE,
            })?;
        let Ok(msg_type) = s.parse();
        Ok(msg_type)
    }

    /// Returns the MsgSeqNum from the header.
    ///
    /// # Errors
    /// Returns `DecodeError` if tag 34 is absent or malformed.
    pub fn seq_num(&self) -> Result<u64, DecodeError> {
        self.header.get_parsed(tags::MSG_SEQ_NUM)
    }

    /// Returns the BeginString from the header, if present.
    #[must_use]
    pub fn begin_string(&self) -> Option<&str> {
        self.header.get_str(tags::BEGIN_STRING)
    }

    /// Returns true if PossDupFlag (43) is Y.
    #[must_use]
    pub fn is_poss_dup(&self) -> bool {
        self.header.get_flag(tags::POSS_DUP_FLAG)
    }

    /// Returns true if this message carries an administrative MsgType.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.msg_type().is_ok_and(|t| t.is_admin())
    }
}

impl PartialEq for Message {
    /// Field-content equality; `receive_time` is transport metadata and is
    /// not compared, so the round-trip law holds for inbound messages too.
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.body == other.body && self.trailer == other.trailer
    }
}

impl Eq for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_type_roundtrip() {
        for s in ["0", "1", "2", "3", "4", "5", "A", "j", "D", "8", "AE"] {
            let t: MsgType = s.parse().unwrap();
            assert_eq!(t.as_str(), s);
        }
    }

    #[test]
    fn msg_type_admin_alphabet() {
        assert!(MsgType::Logon.is_admin());
        assert!(MsgType::SequenceReset.is_admin());
        assert!(!MsgType::BusinessMessageReject.is_admin());
        assert!(!MsgType::Other("D".into()).is_admin());
        assert!(MsgType::Other("D".into()).is_app());
    }

    #[test]
    fn message_of_type() {
        let msg = Message::of_type(&MsgType::Logon);
        assert_eq!(msg.msg_type().unwrap(), MsgType::Logon);
        assert!(msg.is_admin());
    }

    #[test]
    fn message_seq_num() {
        let mut msg = Message::of_type(&MsgType::Heartbeat);
        assert!(msg.seq_num().is_err());
        msg.header.set_uint(tags::MSG_SEQ_NUM, 12);
        assert_eq!(msg.seq_num().unwrap(), 12);
    }

    #[test]
    fn message_poss_dup() {
        let mut msg = Message::of_type(&MsgType::Other("D".into()));
        assert!(!msg.is_poss_dup());
        msg.header.set_flag(tags::POSS_DUP_FLAG, true);
        assert!(msg.is_poss_dup());
    }

    #[test]
    fn equality_ignores_receive_time() {
        let mut a = Message::of_type(&MsgType::Heartbeat);
        let mut b = a.clone();
        a.receive_time = Some(Timestamp::from_millis(1));
        b.receive_time = None;
        assert_eq!(a, b);
    }
}
