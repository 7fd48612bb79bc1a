/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The message store contract.
//!
//! A store is owned exclusively by one session; the session serializes all
//! access. The session relies on exactly one law: `save_message(seq, b)`
//! followed by `close` and a later `refresh` returns `b` for `seq` from
//! `get_messages`. Counter mutations and `reset` must be durable before
//! they return.

use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::StoreError;
use ferrofix_core::types::Timestamp;

/// Persistence interface backing a single FIX session.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Reloads counters and the message index from the backing medium,
    /// discarding unsaved in-memory state.
    async fn refresh(&self) -> Result<(), StoreError>;

    /// Zeroes both counters to 1, drops all saved messages, and moves the
    /// creation time to now.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Returns the next outgoing sequence number.
    fn next_sender_seq(&self) -> u64;

    /// Returns the next expected incoming sequence number.
    fn next_target_seq(&self) -> u64;

    /// Sets the next outgoing sequence number.
    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Sets the next expected incoming sequence number.
    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError>;

    /// Advances the next outgoing sequence number by one.
    async fn incr_next_sender_seq(&self) -> Result<(), StoreError> {
        self.set_next_sender_seq(self.next_sender_seq() + 1).await
    }

    /// Advances the next expected incoming sequence number by one.
    async fn incr_next_target_seq(&self) -> Result<(), StoreError> {
        self.set_next_target_seq(self.next_target_seq() + 1).await
    }

    /// Appends an outgoing message under its sequence number.
    async fn save_message(&self, seq: u64, bytes: Bytes) -> Result<(), StoreError>;

    /// Returns saved messages with `begin <= seq <= end`, ascending.
    /// `end == 0` means unbounded. Sequence numbers with no saved message
    /// are simply absent from the result (the session gap-fills them).
    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError>;

    /// Returns the instant this session epoch began.
    fn creation_time(&self) -> Timestamp;

    /// Flushes and releases the backing medium.
    async fn close(&self) -> Result<(), StoreError>;
}
