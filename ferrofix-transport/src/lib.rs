/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! # Ferrofix Transport
//!
//! Stream framing for the ferrofix FIX session engine.
//!
//! This crate provides the tokio codec that splits a TCP byte stream into
//! complete FIX frames by reading BeginString and BodyLength. Structural
//! and checksum validation belongs to `ferrofix-codec`; the framer only
//! delimits.

pub mod framer;

pub use framer::{FixFramer, FramerError};
