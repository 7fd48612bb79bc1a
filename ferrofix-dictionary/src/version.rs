/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX protocol version table.

use serde::{Deserialize, Serialize};

/// FIX protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    /// FIX 4.0
    Fix40,
    /// FIX 4.1
    Fix41,
    /// FIX 4.2
    Fix42,
    /// FIX 4.3
    Fix43,
    /// FIX 4.4
    Fix44,
    /// FIX 5.0
    Fix50,
    /// FIX 5.0 SP1
    Fix50Sp1,
    /// FIX 5.0 SP2
    Fix50Sp2,
    /// FIXT 1.1 (transport layer for FIX 5.0+)
    Fixt11,
}

impl Version {
    /// Returns the BeginString carried on the wire for this version.
    #[must_use]
    pub const fn begin_string(&self) -> &'static str {
        match self {
            Self::Fix40 => "FIX.4.0",
            Self::Fix41 => "FIX.4.1",
            Self::Fix42 => "FIX.4.2",
            Self::Fix43 => "FIX.4.3",
            Self::Fix44 => "FIX.4.4",
            Self::Fix50 | Self::Fix50Sp1 | Self::Fix50Sp2 | Self::Fixt11 => "FIXT.1.1",
        }
    }

    /// Resolves a BeginString to a version. FIXT.1.1 resolves to `Fixt11`;
    /// the application version then comes from DefaultApplVerID.
    #[must_use]
    pub fn from_begin_string(s: &str) -> Option<Self> {
        Some(match s {
            "FIX.4.0" => Self::Fix40,
            "FIX.4.1" => Self::Fix41,
            "FIX.4.2" => Self::Fix42,
            "FIX.4.3" => Self::Fix43,
            "FIX.4.4" => Self::Fix44,
            "FIXT.1.1" => Self::Fixt11,
            _ => return None,
        })
    }

    /// Returns the ApplVerID (tag 1128/1137 value) for FIX 5.0+ versions.
    #[must_use]
    pub const fn appl_ver_id(&self) -> Option<&'static str> {
        match self {
            Self::Fix50 => Some("7"),
            Self::Fix50Sp1 => Some("8"),
            Self::Fix50Sp2 => Some("9"),
            _ => None,
        }
    }

    /// Returns true if this version rides on the FIXT transport layer.
    #[must_use]
    pub const fn uses_fixt(&self) -> bool {
        matches!(
            self,
            Self::Fix50 | Self::Fix50Sp1 | Self::Fix50Sp2 | Self::Fixt11
        )
    }

    /// Returns true if SendingTime may carry sub-second precision
    /// (FIX 4.2 and later).
    #[must_use]
    pub const fn supports_subsecond_time(&self) -> bool {
        !matches!(self, Self::Fix40 | Self::Fix41)
    }

    /// Returns the EndSeqNo value meaning "to infinity" in a ResendRequest:
    /// 0 for FIX 4.2+, 999999 for earlier versions.
    #[must_use]
    pub const fn unbounded_end_seq_no(&self) -> u64 {
        match self {
            Self::Fix40 | Self::Fix41 => 999_999,
            _ => 0,
        }
    }

    /// Returns true if Reject (3) carries SessionRejectReason (373) and
    /// RefTagID (371); both entered the specification with FIX 4.2.
    #[must_use]
    pub const fn has_session_reject_reason(&self) -> bool {
        !matches!(self, Self::Fix40 | Self::Fix41)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.begin_string())
    }
}
