/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Store
//!
//! Message persistence for the ferrofix FIX session engine.
//!
//! This crate provides:
//! - **`MessageStore` trait**: the contract the session layer relies on for
//!   sequence-number accounting and resend replay
//! - **`MemoryStore`**: non-persistent store for tests and transient sessions
//! - **`FileStore`**: append-only file-backed store with a checkpointed index

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::MessageStore;
