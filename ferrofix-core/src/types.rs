/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Core scalar types for FIX session operations.
//!
//! This module provides:
//! - [`SeqNum`]: message sequence number
//! - [`Timestamp`]: UTC instant with the FIX wire renderings
//! - [`CompId`]: component identifier (SenderCompID, TargetCompID)
//! - [`SessionId`]: the composite session identity used as registry key

use arrayvec::ArrayString;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// Maximum length for CompID strings in bytes.
pub const COMP_ID_MAX_LEN: usize = 32;

/// FIX message sequence number.
///
/// Sequence numbers start at 1 and increase by one per message in each
/// direction; they only restart across an explicit session reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SeqNum(u64);

impl SeqNum {
    /// Creates a new sequence number.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the following sequence number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns true for valid FIX sequence numbers (>= 1).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 1
    }
}

impl Default for SeqNum {
    fn default() -> Self {
        Self(1)
    }
}

impl From<u64> for SeqNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SeqNum> for u64 {
    fn from(seq: SeqNum) -> Self {
        seq.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC instant with FIX wire renderings.
///
/// FIX 4.0/4.1 carry SendingTime with whole-second precision
/// (`YYYYMMDD-HH:MM:SS`); FIX 4.2 and later permit milliseconds
/// (`YYYYMMDD-HH:MM:SS.sss`). Both renderings and parsers live here so the
/// session can pick by BeginString.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Nanoseconds since the Unix epoch.
    nanos_since_epoch: i64,
}

impl Timestamp {
    /// Creates a timestamp from nanoseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self {
            nanos_since_epoch: nanos,
        }
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self {
            nanos_since_epoch: millis * 1_000_000,
        }
    }

    /// Returns the current UTC instant.
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Utc::now().into()
    }

    /// Returns nanoseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.nanos_since_epoch
    }

    /// Returns milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.nanos_since_epoch / 1_000_000
    }

    /// Converts to a chrono `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos_since_epoch)
    }

    /// Renders in FIX format with whole-second precision
    /// (`YYYYMMDD-HH:MM:SS`), used by FIX 4.0/4.1.
    #[must_use]
    pub fn format_seconds(self) -> ArrayString<17> {
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(
            &mut buf,
            format_args!("{}", self.to_datetime().format("%Y%m%d-%H:%M:%S")),
        );
        buf
    }

    /// Renders in FIX format with millisecond precision
    /// (`YYYYMMDD-HH:MM:SS.sss`), used by FIX 4.2 and later.
    #[must_use]
    pub fn format_millis(self) -> ArrayString<21> {
        let mut buf = ArrayString::new();
        let _ = std::fmt::write(
            &mut buf,
            format_args!("{}", self.to_datetime().format("%Y%m%d-%H:%M:%S%.3f")),
        );
        buf
    }

    /// Parses a FIX timestamp, accepting second, millisecond, and
    /// microsecond precision.
    ///
    /// # Errors
    /// Returns `DecodeError::InvalidValue` for unparseable input.
    pub fn parse_fix(s: &str) -> Result<Self, DecodeError> {
        let fmt = if s.len() > 17 {
            "%Y%m%d-%H:%M:%S%.f"
        } else {
            "%Y%m%d-%H:%M:%S"
        };
        let naive =
            NaiveDateTime::parse_from_str(s, fmt).map_err(|e| DecodeError::InvalidValue {
                tag: crate::tags::SENDING_TIME,
                reason: format!("bad timestamp '{s}': {e}"),
            })?;
        Ok(Self::from(naive.and_utc()))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            nanos_since_epoch: dt.timestamp_nanos_opt().unwrap_or(0),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_millis())
    }
}

/// Component identifier for FIX sessions (tags 49, 56, and friends).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct CompId(ArrayString<COMP_ID_MAX_LEN>);

impl CompId {
    /// Creates a new CompId.
    ///
    /// # Returns
    /// `Some(CompId)` if the string fits within the maximum length.
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns true if the identifier is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for CompId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompId {
    type Err = arrayvec::CapacityError<()>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArrayString::try_from(s)
            .map(Self)
            .map_err(|_| arrayvec::CapacityError::new(()))
    }
}

/// Composite session identity.
///
/// Equality is structural and the type is hashable; the engine uses it as
/// the registry key. Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    /// BeginString (e.g. "FIX.4.4").
    pub begin_string: String,
    /// SenderCompID (tag 49), from our point of view.
    pub sender_comp_id: CompId,
    /// TargetCompID (tag 56), from our point of view.
    pub target_comp_id: CompId,
    /// Optional session qualifier, distinguishing parallel sessions between
    /// the same CompID pair.
    pub qualifier: Option<String>,
    /// Optional SenderSubID (tag 50).
    pub sender_sub_id: Option<String>,
    /// Optional SenderLocationID (tag 142).
    pub sender_location_id: Option<String>,
    /// Optional TargetSubID (tag 57).
    pub target_sub_id: Option<String>,
    /// Optional TargetLocationID (tag 143).
    pub target_location_id: Option<String>,
}

impl SessionId {
    /// Creates a session identity from the three mandatory parts.
    ///
    /// # Arguments
    /// * `begin_string` - The FIX version string
    /// * `sender_comp_id` - Our CompID
    /// * `target_comp_id` - The counterparty CompID
    #[must_use]
    pub fn new(
        begin_string: impl Into<String>,
        sender_comp_id: CompId,
        target_comp_id: CompId,
    ) -> Self {
        Self {
            begin_string: begin_string.into(),
            sender_comp_id,
            target_comp_id,
            qualifier: None,
            sender_sub_id: None,
            sender_location_id: None,
            target_sub_id: None,
            target_location_id: None,
        }
    }

    /// Sets the session qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Sets the SenderSubID.
    #[must_use]
    pub fn with_sender_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.sender_sub_id = Some(sub_id.into());
        self
    }

    /// Sets the TargetSubID.
    #[must_use]
    pub fn with_target_sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.target_sub_id = Some(sub_id.into());
        self
    }

    /// Sets the SenderLocationID.
    #[must_use]
    pub fn with_sender_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.sender_location_id = Some(location_id.into());
        self
    }

    /// Sets the TargetLocationID.
    #[must_use]
    pub fn with_target_location_id(mut self, location_id: impl Into<String>) -> Self {
        self.target_location_id = Some(location_id.into());
        self
    }

    /// Returns the identity with sender and target roles swapped, which is
    /// how an acceptor matches the CompIDs on an inbound Logon against its
    /// own configured sessions.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            begin_string: self.begin_string.clone(),
            sender_comp_id: self.target_comp_id.clone(),
            target_comp_id: self.sender_comp_id.clone(),
            qualifier: self.qualifier.clone(),
            sender_sub_id: self.target_sub_id.clone(),
            sender_location_id: self.target_location_id.clone(),
            target_sub_id: self.sender_sub_id.clone(),
            target_location_id: self.sender_location_id.clone(),
        }
    }

    /// Returns the filename prefix `Sender-Target[-Qualifier]` used by the
    /// file store and file log layouts.
    #[must_use]
    pub fn file_prefix(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}-{}-{}", self.sender_comp_id, self.target_comp_id, q),
            None => format!("{}-{}", self.sender_comp_id, self.target_comp_id),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )?;
        if let Some(q) = &self.qualifier {
            write!(f, "/{q}")?;
        }
        Ok(())
    }
}
