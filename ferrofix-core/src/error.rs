/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Error types for the ferrofix FIX session engine.
//!
//! Two families of errors cross the wire boundary:
//! - [`MessageRejectError`]: recoverable, answered with a session-level
//!   Reject (3) or BusinessMessageReject (j); the target sequence number
//!   still advances.
//! - [`SessionError`]: structural session-protocol failures (sequence gaps,
//!   BeginString mismatch) that drive state transitions rather than rejects.
//!
//! Everything else (codec, store, config, I/O) is internal and escalates to
//! a disconnect.

use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all ferrofix operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in message store operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error in configuration handling.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Message failed dictionary or header validation.
    #[error("message rejected: {0}")]
    Reject(#[from] MessageRejectError),

    /// I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while decoding FIX wire bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message buffer is incomplete, need more data.
    #[error("incomplete message, need more data")]
    Incomplete,

    /// BeginString (8) is not the first tag of the message.
    #[error("begin string (8) must lead the message")]
    BeginStringNotFirst,

    /// BodyLength (9) is not the second tag of the message.
    #[error("body length (9) must follow begin string")]
    BodyLengthNotSecond,

    /// MsgType (35) is not the third tag of the message.
    #[error("msg type (35) must follow body length")]
    MsgTypeNotThird,

    /// CheckSum (10) is not the last tag of the message.
    #[error("checksum (10) must trail the message")]
    ChecksumNotLast,

    /// Declared BodyLength does not cover the actual body span.
    #[error("body length mismatch: declared {declared}, actual {actual}")]
    BodyLengthMismatch {
        /// Value carried in tag 9.
        declared: usize,
        /// Byte count measured on the wire.
        actual: usize,
    },

    /// Declared and computed checksums disagree.
    #[error("checksum mismatch: computed {computed}, declared {declared}")]
    ChecksumMismatch {
        /// Checksum computed over the message bytes.
        computed: u8,
        /// Checksum carried in tag 10.
        declared: u8,
    },

    /// Tag bytes are not a valid positive integer.
    #[error("malformed tag: {0}")]
    MalformedTag(String),

    /// A referenced field is absent from the message.
    #[error("missing field: tag {tag}")]
    MissingField {
        /// Tag number of the absent field.
        tag: u32,
    },

    /// A field value failed to parse as the requested type.
    #[error("invalid value for tag {tag}: {reason}")]
    InvalidValue {
        /// Tag number of the offending field.
        tag: u32,
        /// Why the value is unusable.
        reason: String,
    },

    /// Invalid UTF-8 in a string field.
    #[error("invalid utf-8 in field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Message exceeds the configured maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },
}

/// Errors that occur while encoding a message to wire bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A field the encoder needs is absent.
    #[error("missing field for encode: tag {tag}")]
    MissingField {
        /// Tag number of the absent field.
        tag: u32,
    },

    /// A field value cannot be represented on the wire.
    #[error("unencodable value for tag {tag}: {reason}")]
    InvalidValue {
        /// Tag number of the offending field.
        tag: u32,
        /// Why the value cannot be encoded.
        reason: String,
    },
}

/// Structural session-protocol errors.
///
/// These do not produce a Reject message; they drive the state machine
/// (resend request, logout, disconnect).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Counterparty sequence number is ahead of ours; a gap must be filled.
    #[error("MsgSeqNum too high, expecting {expected} but received {received}")]
    TargetTooHigh {
        /// Sequence number we expected.
        expected: u64,
        /// Sequence number that arrived.
        received: u64,
    },

    /// Counterparty sequence number is behind ours and not a possible duplicate.
    #[error("MsgSeqNum too low, expecting {expected} but received {received}")]
    TargetTooLow {
        /// Sequence number we expected.
        expected: u64,
        /// Sequence number that arrived.
        received: u64,
    },

    /// BeginString of the inbound message does not match the session.
    #[error("incorrect BeginString: {received}")]
    IncorrectBeginString {
        /// BeginString carried by the message.
        received: String,
    },

    /// The session is not in a state that allows the operation.
    #[error("invalid session state for {operation}: {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: String,
        /// State the session was in.
        state: String,
    },

    /// The session actor has shut down and no longer accepts work.
    #[error("session terminated")]
    Terminated,

    /// Transport connection failure.
    #[error("connection error: {0}")]
    Connection(String),
}

/// Errors in message store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to persist a message.
    #[error("failed to save message seq={seq}: {reason}")]
    SaveFailed {
        /// Sequence number of the message.
        seq: u64,
        /// Reason for failure.
        reason: String,
    },

    /// Store contents are inconsistent with the index.
    #[error("store corrupted: {reason}")]
    Corrupted {
        /// Description of the inconsistency.
        reason: String,
    },

    /// I/O error in a persistent store.
    #[error("store i/o error: {0}")]
    Io(String),
}

/// Errors raised while loading or merging settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing setting: {0}")]
    MissingSetting(String),

    /// A setting value failed to parse.
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Setting key.
        key: String,
        /// Why the value is unusable.
        reason: String,
    },

    /// The settings file failed to parse.
    #[error("settings parse error: {0}")]
    Parse(String),
}

/// Reject reasons for session-level Reject (3), per tag 373.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// 0: Invalid tag number.
    InvalidTagNumber,
    /// 1: Required tag missing.
    RequiredTagMissing,
    /// 2: Tag not defined for this message type.
    TagNotDefinedForMessage,
    /// 3: Undefined tag.
    UndefinedTag,
    /// 4: Tag specified without a value.
    TagSpecifiedWithoutValue,
    /// 5: Value is incorrect (out of range) for this tag.
    ValueIsIncorrect,
    /// 6: Incorrect data format for value.
    IncorrectDataFormat,
    /// 7: Decryption problem.
    DecryptionProblem,
    /// 8: Signature problem.
    SignatureProblem,
    /// 9: CompID problem.
    CompIdProblem,
    /// 10: SendingTime accuracy problem.
    SendingTimeAccuracyProblem,
    /// 11: Invalid MsgType.
    InvalidMsgType,
    /// 3 (tag 380): Unsupported message type, answered at business level.
    UnsupportedMessageType,
    /// Any other reason code.
    Other(u32),
}

impl RejectReason {
    /// Returns the numeric reason code carried in tag 373 (or 380).
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::InvalidTagNumber => 0,
            Self::RequiredTagMissing => 1,
            Self::TagNotDefinedForMessage => 2,
            Self::UndefinedTag => 3,
            Self::TagSpecifiedWithoutValue => 4,
            Self::ValueIsIncorrect => 5,
            Self::IncorrectDataFormat => 6,
            Self::DecryptionProblem => 7,
            Self::SignatureProblem => 8,
            Self::CompIdProblem => 9,
            Self::SendingTimeAccuracyProblem => 10,
            Self::InvalidMsgType => 11,
            Self::UnsupportedMessageType => 3,
            Self::Other(code) => code,
        }
    }

    /// Returns true if the reject must be answered with
    /// BusinessMessageReject (j) rather than a session Reject (3).
    #[must_use]
    pub const fn is_business(self) -> bool {
        matches!(self, Self::UnsupportedMessageType)
    }
}

/// Recoverable wire-level rejection of an inbound message.
///
/// Carries the offending tag and referenced message type so the session can
/// build a Reject (3) or BusinessMessageReject (j). After the reject is sent
/// the target sequence number advances and the session continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{text} (reason {})", .reason.code())]
pub struct MessageRejectError {
    /// Why the message is rejected.
    pub reason: RejectReason,
    /// Tag that triggered the rejection, if attributable.
    pub ref_tag_id: Option<u32>,
    /// MsgType of the rejected message, if known.
    pub ref_msg_type: Option<String>,
    /// Human-readable explanation, sent in tag 58.
    pub text: String,
}

impl MessageRejectError {
    /// Creates a reject with the given reason and text.
    #[must_use]
    pub fn new(reason: RejectReason, text: impl Into<String>) -> Self {
        Self {
            reason,
            ref_tag_id: None,
            ref_msg_type: None,
            text: text.into(),
        }
    }

    /// Attaches the offending tag.
    #[must_use]
    pub fn with_ref_tag(mut self, tag: u32) -> Self {
        self.ref_tag_id = Some(tag);
        self
    }

    /// Attaches the referenced message type.
    #[must_use]
    pub fn with_ref_msg_type(mut self, msg_type: impl Into<String>) -> Self {
        self.ref_msg_type = Some(msg_type.into());
        self
    }

    /// Shorthand for a RequiredTagMissing reject.
    #[must_use]
    pub fn required_tag_missing(tag: u32) -> Self {
        Self::new(
            RejectReason::RequiredTagMissing,
            format!("required tag missing: {tag}"),
        )
        .with_ref_tag(tag)
    }

    /// Shorthand for a TagNotDefinedForMessage reject.
    #[must_use]
    pub fn tag_not_defined(tag: u32, msg_type: impl Into<String>) -> Self {
        Self::new(
            RejectReason::TagNotDefinedForMessage,
            format!("tag not defined for this message type: {tag}"),
        )
        .with_ref_tag(tag)
        .with_ref_msg_type(msg_type)
    }

    /// Shorthand for a ValueIsIncorrect reject.
    #[must_use]
    pub fn value_is_incorrect(tag: u32) -> Self {
        Self::new(
            RejectReason::ValueIsIncorrect,
            format!("value is incorrect (out of range) for this tag: {tag}"),
        )
        .with_ref_tag(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_codes() {
        assert_eq!(RejectReason::InvalidTagNumber.code(), 0);
        assert_eq!(RejectReason::CompIdProblem.code(), 9);
        assert_eq!(RejectReason::InvalidMsgType.code(), 11);
        assert_eq!(RejectReason::Other(99).code(), 99);
    }

    #[test]
    fn business_rejects() {
        assert!(RejectReason::UnsupportedMessageType.is_business());
        assert!(!RejectReason::RequiredTagMissing.is_business());
    }

    #[test]
    fn message_reject_builders() {
        let err = MessageRejectError::required_tag_missing(108);
        assert_eq!(err.reason, RejectReason::RequiredTagMissing);
        assert_eq!(err.ref_tag_id, Some(108));

        let err = MessageRejectError::tag_not_defined(55, "A");
        assert_eq!(err.ref_msg_type.as_deref(), Some("A"));
    }

    #[test]
    fn session_error_display() {
        let err = SessionError::TargetTooHigh {
            expected: 5,
            received: 8,
        };
        assert_eq!(
            err.to_string(),
            "MsgSeqNum too high, expecting 5 but received 8"
        );
    }

    #[test]
    fn fix_error_from_decode() {
        let err: FixError = DecodeError::Incomplete.into();
        assert!(matches!(err, FixError::Decode(DecodeError::Incomplete)));
    }
}
