/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session configuration.
//!
//! Two layers:
//! - [`SessionConfig`]: the fully-resolved per-session configuration the
//!   session core consumes, with builder-style setters for programmatic use
//! - [`Settings`]: the two-level settings file (a `[default]` table plus one
//!   `[session.<name>]` table per session), where per-session values
//!   override defaults

use crate::schedule::SessionSchedule;
use chrono::{FixedOffset, NaiveTime, Offset, Weekday};
use ferrofix_core::error::ConfigError;
use ferrofix_core::types::{CompId, SessionId};
use ferrofix_dictionary::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default heartbeat interval in seconds.
const DEFAULT_HEART_BT_INT: u64 = 30;

/// Default logon response deadline in seconds.
const DEFAULT_LOGON_TIMEOUT: u64 = 10;

/// Default logout reply deadline in seconds.
const DEFAULT_LOGOUT_TIMEOUT: u64 = 2;

/// Default maximum inbound message size in bytes.
const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Fully-resolved configuration for one FIX session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The session identity.
    pub session_id: SessionId,
    /// Heartbeat interval (HeartBtInt).
    pub heart_bt_int: Duration,
    /// Deadline for the counterparty's Logon response.
    pub logon_timeout: Duration,
    /// Deadline for the counterparty's Logout reply.
    pub logout_timeout: Duration,
    /// Reset sequence numbers when a logon exchange starts.
    pub reset_on_logon: bool,
    /// Reset sequence numbers on logout.
    pub reset_on_logout: bool,
    /// Reset sequence numbers when the connection drops.
    pub reset_on_disconnect: bool,
    /// Reload persisted counters from the store before logging on.
    pub refresh_on_logon: bool,
    /// True for initiator sessions (we dial and send the first Logon).
    pub initiate_logon: bool,
    /// The in-session time window.
    pub schedule: SessionSchedule,
    /// DefaultApplVerID sent on FIXT logons.
    pub default_appl_ver_id: Option<String>,
    /// Counterparty host for initiator sessions.
    pub socket_connect_host: Option<String>,
    /// Counterparty port for initiator sessions.
    pub socket_connect_port: Option<u16>,
    /// Listen port for acceptor sessions.
    pub socket_accept_port: Option<u16>,
    /// Directory for the file store, when persistent.
    pub file_store_path: Option<PathBuf>,
    /// Directory for file logs, when used.
    pub file_log_path: Option<PathBuf>,
    /// Driver name for a SQL-backed store.
    pub sql_store_driver: Option<String>,
    /// Connection string for a SQL-backed store.
    pub sql_store_data_source_name: Option<String>,
    /// Combined data dictionary path (FIX 4.x).
    pub data_dictionary: Option<PathBuf>,
    /// Transport (admin) dictionary path (FIXT).
    pub transport_data_dictionary: Option<PathBuf>,
    /// Application dictionary path (FIXT).
    pub app_data_dictionary: Option<PathBuf>,
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
    /// Whether to verify inbound checksums.
    pub validate_checksum: bool,
}

impl SessionConfig {
    /// Creates a configuration with defaults for the given identity.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            heart_bt_int: Duration::from_secs(DEFAULT_HEART_BT_INT),
            logon_timeout: Duration::from_secs(DEFAULT_LOGON_TIMEOUT),
            logout_timeout: Duration::from_secs(DEFAULT_LOGOUT_TIMEOUT),
            reset_on_logon: false,
            reset_on_logout: false,
            reset_on_disconnect: false,
            refresh_on_logon: false,
            initiate_logon: false,
            schedule: SessionSchedule::always_open(),
            default_appl_ver_id: None,
            socket_connect_host: None,
            socket_connect_port: None,
            socket_accept_port: None,
            file_store_path: None,
            file_log_path: None,
            sql_store_driver: None,
            sql_store_data_source_name: None,
            data_dictionary: None,
            transport_data_dictionary: None,
            app_data_dictionary: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            validate_checksum: true,
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub const fn with_heart_bt_int(mut self, interval: Duration) -> Self {
        self.heart_bt_int = interval;
        self
    }

    /// Marks this session as an initiator.
    #[must_use]
    pub const fn with_initiate_logon(mut self, initiate: bool) -> Self {
        self.initiate_logon = initiate;
        self
    }

    /// Sets sequence reset on logon.
    #[must_use]
    pub const fn with_reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_on_logon = reset;
        self
    }

    /// Sets sequence reset on logout.
    #[must_use]
    pub const fn with_reset_on_logout(mut self, reset: bool) -> Self {
        self.reset_on_logout = reset;
        self
    }

    /// Sets sequence reset on disconnect.
    #[must_use]
    pub const fn with_reset_on_disconnect(mut self, reset: bool) -> Self {
        self.reset_on_disconnect = reset;
        self
    }

    /// Sets store refresh before logon.
    #[must_use]
    pub const fn with_refresh_on_logon(mut self, refresh: bool) -> Self {
        self.refresh_on_logon = refresh;
        self
    }

    /// Sets the in-session time window.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: SessionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Sets the logon deadline.
    #[must_use]
    pub const fn with_logon_timeout(mut self, timeout: Duration) -> Self {
        self.logon_timeout = timeout;
        self
    }

    /// Sets the logout deadline.
    #[must_use]
    pub const fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Sets the DefaultApplVerID for FIXT sessions.
    #[must_use]
    pub fn with_default_appl_ver_id(mut self, ver: impl Into<String>) -> Self {
        self.default_appl_ver_id = Some(ver.into());
        self
    }

    /// Resolves the configured BeginString to a protocol version.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        Version::from_begin_string(&self.session_id.begin_string)
    }
}

/// One settings table: every key optional so tables can layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    /// BeginString (e.g. "FIX.4.4").
    pub begin_string: Option<String>,
    /// SenderCompID.
    pub sender_comp_id: Option<String>,
    /// TargetCompID.
    pub target_comp_id: Option<String>,
    /// Session qualifier.
    pub session_qualifier: Option<String>,
    /// SenderSubID.
    pub sender_sub_id: Option<String>,
    /// SenderLocationID.
    pub sender_location_id: Option<String>,
    /// TargetSubID.
    pub target_sub_id: Option<String>,
    /// TargetLocationID.
    pub target_location_id: Option<String>,
    /// Heartbeat interval in seconds.
    pub heart_bt_int: Option<u64>,
    /// Logon deadline in seconds.
    pub logon_timeout: Option<u64>,
    /// Logout deadline in seconds.
    pub logout_timeout: Option<u64>,
    /// Window open time, `HH:MM:SS`.
    pub start_time: Option<String>,
    /// Window close time, `HH:MM:SS`.
    pub end_time: Option<String>,
    /// Window open day (weekly windows).
    pub start_day: Option<String>,
    /// Window close day (weekly windows).
    pub end_day: Option<String>,
    /// UTC offset for window times, e.g. "+09:00".
    pub time_zone: Option<String>,
    /// Interpret window times in the machine-local offset.
    pub use_local_time: Option<bool>,
    /// Reset sequence numbers on logon.
    pub reset_on_logon: Option<bool>,
    /// Reset sequence numbers on logout.
    pub reset_on_logout: Option<bool>,
    /// Reset sequence numbers on disconnect.
    pub reset_on_disconnect: Option<bool>,
    /// Refresh the store before logon.
    pub refresh_on_logon: Option<bool>,
    /// Counterparty host (initiator).
    pub socket_connect_host: Option<String>,
    /// Counterparty port (initiator).
    pub socket_connect_port: Option<u16>,
    /// Listen port (acceptor).
    pub socket_accept_port: Option<u16>,
    /// File log directory.
    pub file_log_path: Option<String>,
    /// File store directory.
    pub file_store_path: Option<String>,
    /// Driver name for a SQL-backed store.
    pub sql_store_driver: Option<String>,
    /// Connection string for a SQL-backed store.
    pub sql_store_data_source_name: Option<String>,
    /// Combined data dictionary path.
    pub data_dictionary: Option<String>,
    /// Transport dictionary path.
    pub transport_data_dictionary: Option<String>,
    /// Application dictionary path.
    pub app_data_dictionary: Option<String>,
    /// DefaultApplVerID for FIXT sessions.
    pub default_appl_ver_id: Option<String>,
}

macro_rules! overlay_fields {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        SessionSettings {
            $($field: $over.$field.clone().or_else(|| $base.$field.clone()),)+
        }
    };
}

impl SessionSettings {
    /// Layers `self` over `base`: present values win, absent values fall
    /// through.
    #[must_use]
    pub fn overlay(&self, base: &Self) -> Self {
        overlay_fields!(
            base,
            self,
            begin_string,
            sender_comp_id,
            target_comp_id,
            session_qualifier,
            sender_sub_id,
            sender_location_id,
            target_sub_id,
            target_location_id,
            heart_bt_int,
            logon_timeout,
            logout_timeout,
            start_time,
            end_time,
            start_day,
            end_day,
            time_zone,
            use_local_time,
            reset_on_logon,
            reset_on_logout,
            reset_on_disconnect,
            refresh_on_logon,
            socket_connect_host,
            socket_connect_port,
            socket_accept_port,
            file_log_path,
            file_store_path,
            sql_store_driver,
            sql_store_data_source_name,
            data_dictionary,
            transport_data_dictionary,
            app_data_dictionary,
            default_appl_ver_id,
        )
    }

    /// Resolves this (already merged) table into a session configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` for missing identity keys or unparseable
    /// values.
    pub fn build(&self) -> Result<SessionConfig, ConfigError> {
        let begin_string = self
            .begin_string
            .clone()
            .ok_or_else(|| ConfigError::MissingSetting("begin_string".into()))?;
        let sender = comp_id("sender_comp_id", self.sender_comp_id.as_deref())?;
        let target = comp_id("target_comp_id", self.target_comp_id.as_deref())?;

        let mut session_id = SessionId::new(begin_string, sender, target);
        if let Some(q) = &self.session_qualifier {
            session_id = session_id.with_qualifier(q);
        }
        if let Some(v) = &self.sender_sub_id {
            session_id = session_id.with_sender_sub_id(v);
        }
        if let Some(v) = &self.sender_location_id {
            session_id = session_id.with_sender_location_id(v);
        }
        if let Some(v) = &self.target_sub_id {
            session_id = session_id.with_target_sub_id(v);
        }
        if let Some(v) = &self.target_location_id {
            session_id = session_id.with_target_location_id(v);
        }

        let mut config = SessionConfig::new(session_id);
        if let Some(secs) = self.heart_bt_int {
            config.heart_bt_int = Duration::from_secs(secs);
        }
        if let Some(secs) = self.logon_timeout {
            config.logon_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.logout_timeout {
            config.logout_timeout = Duration::from_secs(secs);
        }
        config.reset_on_logon = self.reset_on_logon.unwrap_or(false);
        config.reset_on_logout = self.reset_on_logout.unwrap_or(false);
        config.reset_on_disconnect = self.reset_on_disconnect.unwrap_or(false);
        config.refresh_on_logon = self.refresh_on_logon.unwrap_or(false);
        config.schedule = self.schedule()?;
        config.default_appl_ver_id = self.default_appl_ver_id.clone();
        config.socket_connect_host = self.socket_connect_host.clone();
        config.socket_connect_port = self.socket_connect_port;
        config.socket_accept_port = self.socket_accept_port;
        config.file_store_path = self.file_store_path.clone().map(PathBuf::from);
        config.file_log_path = self.file_log_path.clone().map(PathBuf::from);
        config.sql_store_driver = self.sql_store_driver.clone();
        config.sql_store_data_source_name = self.sql_store_data_source_name.clone();
        config.data_dictionary = self.data_dictionary.clone().map(PathBuf::from);
        config.transport_data_dictionary =
            self.transport_data_dictionary.clone().map(PathBuf::from);
        config.app_data_dictionary = self.app_data_dictionary.clone().map(PathBuf::from);

        Ok(config)
    }

    fn schedule(&self) -> Result<SessionSchedule, ConfigError> {
        let (start, end) = match (&self.start_time, &self.end_time) {
            (None, None) => return Ok(SessionSchedule::always_open()),
            (Some(s), Some(e)) => (parse_time("start_time", s)?, parse_time("end_time", e)?),
            _ => {
                return Err(ConfigError::MissingSetting(
                    "start_time and end_time must be set together".into(),
                ));
            }
        };

        let offset = if self.use_local_time.unwrap_or(false) {
            chrono::Local::now().offset().fix()
        } else if let Some(tz) = &self.time_zone {
            tz.parse::<FixedOffset>()
                .map_err(|e| ConfigError::InvalidSetting {
                    key: "time_zone".into(),
                    reason: e.to_string(),
                })?
        } else {
            FixedOffset::east_opt(0).unwrap_or(chrono::Utc.fix())
        };

        match (&self.start_day, &self.end_day) {
            (None, None) => Ok(SessionSchedule::daily(start, end, offset)),
            (Some(sd), Some(ed)) => Ok(SessionSchedule::weekly(
                start,
                end,
                parse_day("start_day", sd)?,
                parse_day("end_day", ed)?,
                offset,
            )),
            _ => Err(ConfigError::MissingSetting(
                "start_day and end_day must be set together".into(),
            )),
        }
    }
}

fn comp_id(key: &str, value: Option<&str>) -> Result<CompId, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingSetting(key.into()))?;
    CompId::new(value).ok_or_else(|| ConfigError::InvalidSetting {
        key: key.into(),
        reason: "CompID longer than 32 bytes".into(),
    })
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|e| ConfigError::InvalidSetting {
        key: key.into(),
        reason: e.to_string(),
    })
}

fn parse_day(key: &str, value: &str) -> Result<Weekday, ConfigError> {
    value
        .parse::<Weekday>()
        .map_err(|_| ConfigError::InvalidSetting {
            key: key.into(),
            reason: format!("not a weekday: '{value}'"),
        })
}

/// The two-level settings object: `[default]` plus per-session tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Values shared by every session.
    #[serde(default)]
    pub default: SessionSettings,
    /// Per-session tables, keyed by a free-form name.
    #[serde(default)]
    pub session: BTreeMap<String, SessionSettings>,
}

impl Settings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolves every session table over the defaults.
    ///
    /// # Errors
    /// Returns the first `ConfigError` encountered.
    pub fn sessions(&self) -> Result<Vec<(String, SessionConfig)>, ConfigError> {
        self.session
            .iter()
            .map(|(name, settings)| {
                let config = settings.overlay(&self.default).build()?;
                Ok((name.clone(), config))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[default]
begin_string = "FIX.4.4"
sender_comp_id = "BANK"
heart_bt_int = 30
start_time = "08:00:00"
end_time = "17:00:00"

[session.exch]
target_comp_id = "EXCH"

[session.mkt]
target_comp_id = "MKT"
heart_bt_int = 10
reset_on_logon = true
"#;

    #[test]
    fn per_session_overrides_default() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        let sessions = settings.sessions().unwrap();
        assert_eq!(sessions.len(), 2);

        let (_, exch) = sessions.iter().find(|(n, _)| n == "exch").unwrap();
        assert_eq!(exch.heart_bt_int, Duration::from_secs(30));
        assert_eq!(exch.session_id.target_comp_id.as_str(), "EXCH");
        assert!(!exch.reset_on_logon);

        let (_, mkt) = sessions.iter().find(|(n, _)| n == "mkt").unwrap();
        assert_eq!(mkt.heart_bt_int, Duration::from_secs(10));
        assert!(mkt.reset_on_logon);
        // Shared defaults flow through.
        assert_eq!(mkt.session_id.sender_comp_id.as_str(), "BANK");
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = Settings::from_toml("[default]\nnot_a_key = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_identity_is_an_error() {
        let settings = Settings::from_toml("[session.x]\nbegin_string = \"FIX.4.2\"\n").unwrap();
        let err = settings.sessions().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting(_)));
    }

    #[test]
    fn schedule_requires_both_ends() {
        let s = SessionSettings {
            begin_string: Some("FIX.4.2".into()),
            sender_comp_id: Some("A".into()),
            target_comp_id: Some("B".into()),
            start_time: Some("08:00:00".into()),
            ..Default::default()
        };
        assert!(matches!(s.build(), Err(ConfigError::MissingSetting(_))));
    }

    #[test]
    fn weekly_schedule_parses() {
        let s = SessionSettings {
            begin_string: Some("FIX.4.2".into()),
            sender_comp_id: Some("A".into()),
            target_comp_id: Some("B".into()),
            start_time: Some("08:00:00".into()),
            end_time: Some("17:00:00".into()),
            start_day: Some("Monday".into()),
            end_day: Some("Friday".into()),
            time_zone: Some("+09:00".into()),
            ..Default::default()
        };
        let config = s.build().unwrap();
        // Monday 08:00 at UTC+9 is Sunday 23:00 UTC.
        use chrono::TimeZone;
        let monday_morning_tokyo = chrono::Utc
            .with_ymd_and_hms(2024, 1, 14, 23, 30, 0)
            .unwrap();
        assert!(config.schedule.is_in_range(monday_morning_tokyo));
    }

    #[test]
    fn bad_time_zone_rejected() {
        let s = SessionSettings {
            begin_string: Some("FIX.4.2".into()),
            sender_comp_id: Some("A".into()),
            target_comp_id: Some("B".into()),
            start_time: Some("08:00:00".into()),
            end_time: Some("17:00:00".into()),
            time_zone: Some("Tokyo".into()),
            ..Default::default()
        };
        assert!(matches!(
            s.build(),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn qualifier_and_sub_ids_reach_session_id() {
        let s = SessionSettings {
            begin_string: Some("FIX.4.4".into()),
            sender_comp_id: Some("BANK".into()),
            target_comp_id: Some("EXCH".into()),
            session_qualifier: Some("PRIMARY".into()),
            sender_sub_id: Some("DESK".into()),
            ..Default::default()
        };
        let config = s.build().unwrap();
        assert_eq!(config.session_id.qualifier.as_deref(), Some("PRIMARY"));
        assert_eq!(config.session_id.sender_sub_id.as_deref(), Some("DESK"));
        assert_eq!(config.session_id.file_prefix(), "BANK-EXCH-PRIMARY");
    }

    #[test]
    fn version_resolution() {
        let id = SessionId::new(
            "FIX.4.2",
            CompId::new("A").unwrap(),
            CompId::new("B").unwrap(),
        );
        let config = SessionConfig::new(id);
        assert_eq!(config.version(), Some(Version::Fix42));
    }
}
