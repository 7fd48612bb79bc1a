/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Codec
//!
//! FIX tag=value wire codec for the ferrofix session engine.
//!
//! This crate converts between framed wire bytes and the tri-partitioned
//! [`Message`](ferrofix_core::Message):
//! - **Decoding**: enforces the structural contract (8, 9, 35 lead; 10
//!   trails), verifies BodyLength and CheckSum, and partitions fields into
//!   header/body/trailer via the dictionary's tag classifier
//! - **Encoding**: serializes in canonical order and derives BodyLength
//!   and CheckSum
//! - **Checksum**: the mod-256 running sum helpers

pub mod checksum;
pub mod decoder;
pub mod encoder;

pub use decoder::MessageDecoder;
pub use encoder::encode_message;
