/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Dictionary
//!
//! FIX version knowledge and data-dictionary validation for the ferrofix engine.
//!
//! This crate provides:
//! - **Version table**: BeginString forms for FIX 4.0 through 5.0 SP2 and FIXT 1.1
//! - **Tag classification**: the header/trailer tables that drive message
//!   partitioning in the codec
//! - **Message definitions**: required/allowed fields and repeating groups
//! - **Validation**: checking a parsed message against its definition,
//!   yielding a typed `MessageRejectError` on mismatch

pub mod classify;
pub mod schema;
pub mod validate;
pub mod version;

pub use classify::TagClassifier;
pub use schema::{Dictionary, FieldDef, FieldType, GroupDef, MessageDef};
pub use version::Version;
