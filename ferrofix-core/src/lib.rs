/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Core
//!
//! Core types, traits, and error definitions for the ferrofix FIX session engine.
//!
//! This crate provides the fundamental building blocks used across all ferrofix crates:
//! - **Error types**: Unified error handling with `thiserror`, including the
//!   wire-level reject taxonomy (`MessageRejectError`)
//! - **Field types**: `Field` and the insertion-ordered `FieldMap`
//! - **Message types**: the tri-partitioned `Message` (header/body/trailer) and `MsgType`
//! - **Core types**: `SeqNum`, `Timestamp`, `CompId`, `SessionId`
//! - **Tags**: named constants for every tag the session layer touches

pub mod error;
pub mod field;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{
    ConfigError, DecodeError, EncodeError, FixError, MessageRejectError, RejectReason, Result,
    SessionError, StoreError,
};
pub use field::{Field, FieldMap};
pub use message::{Message, MsgType};
pub use types::{CompId, SeqNum, SessionId, Timestamp};
