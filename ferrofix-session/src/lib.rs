/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Session
//!
//! FIX session layer protocol implementation for the ferrofix engine.
//!
//! This crate provides:
//! - **Session actor**: single-task event loop owning all per-session state
//! - **State machine**: the seven-state session lifecycle with per-state
//!   message, timeout, and stop handling
//! - **Sequence discipline**: gap detection, ResendRequest, GapFill
//!   compression, PossDup handling
//! - **Heartbeat clock**: heartbeat, TestRequest escalation, logon/logout
//!   deadlines
//! - **Scheduling**: daily and weekly in-session time windows with forced
//!   resets on day rollover
//! - **Configuration**: per-session config and the two-level settings file

pub mod application;
pub mod config;
pub mod events;
pub mod heartbeat;
pub mod log;
pub mod schedule;
pub mod session;
pub mod state;

pub use application::{Application, DoNotSend, NoOpApplication};
pub use config::{SessionConfig, SessionSettings, Settings};
pub use events::Event;
pub use heartbeat::HeartbeatClock;
pub use log::{NullLog, SessionLog, TracingLog};
pub use schedule::SessionSchedule;
pub use session::{FixIn, Session, SessionHandle};
pub use state::SessionState;
