/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Engine
//!
//! High-level engine facade for the ferrofix FIX session implementation.
//!
//! This crate provides:
//! - **Session registry**: `SessionId -> SessionHandle` with acceptor-side
//!   logon matching by reversed CompIDs
//! - **Message router**: application dispatch keyed on
//!   `(BeginString, MsgType)`
//! - **Engine builder**: spawn a fleet of session actors from settings

pub mod builder;
pub mod registry;
pub mod router;

pub use builder::{Engine, EngineBuilder};
pub use registry::SessionRegistry;
pub use router::MessageRouter;

pub use ferrofix_session::{Application, DoNotSend, NoOpApplication, SessionLog};
