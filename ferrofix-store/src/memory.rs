/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! In-memory message store.
//!
//! Non-persistent; suitable for tests and sessions that reset on every
//! logon. `refresh` is a no-op since memory is the backing medium.

use crate::traits::MessageStore;
use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::StoreError;
use ferrofix_core::types::Timestamp;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory message store backed by a `BTreeMap` for range replay.
#[derive(Debug)]
pub struct MemoryStore {
    messages: Mutex<BTreeMap<u64, Bytes>>,
    next_sender_seq: AtomicU64,
    next_target_seq: AtomicU64,
    creation_time: Mutex<Timestamp>,
}

impl MemoryStore {
    /// Creates an empty store with both counters at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(BTreeMap::new()),
            next_sender_seq: AtomicU64::new(1),
            next_target_seq: AtomicU64::new(1),
            creation_time: Mutex::new(Timestamp::now()),
        }
    }

    /// Creates a store with preset counters, for resuming a session.
    #[must_use]
    pub fn with_seqs(sender: u64, target: u64) -> Self {
        let store = Self::new();
        store.next_sender_seq.store(sender, Ordering::SeqCst);
        store.next_target_seq.store(target, Ordering::SeqCst);
        store
    }

    /// Overrides the creation time, for schedule-rollover tests.
    pub fn set_creation_time(&self, ts: Timestamp) {
        *self.creation_time.lock() = ts;
    }

    /// Returns the number of saved messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn refresh(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.messages.lock().clear();
        self.next_sender_seq.store(1, Ordering::SeqCst);
        self.next_target_seq.store(1, Ordering::SeqCst);
        *self.creation_time.lock() = Timestamp::now();
        Ok(())
    }

    fn next_sender_seq(&self) -> u64 {
        self.next_sender_seq.load(Ordering::SeqCst)
    }

    fn next_target_seq(&self) -> u64 {
        self.next_target_seq.load(Ordering::SeqCst)
    }

    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        self.next_sender_seq.store(seq, Ordering::SeqCst);
        Ok(())
    }

    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        self.next_target_seq.store(seq, Ordering::SeqCst);
        Ok(())
    }

    async fn save_message(&self, seq: u64, bytes: Bytes) -> Result<(), StoreError> {
        self.messages.lock().insert(seq, bytes);
        Ok(())
    }

    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError> {
        let end = if end == 0 { u64::MAX } else { end };
        let messages = self.messages.lock();
        Ok(messages
            .range(begin..=end)
            .map(|(seq, bytes)| (*seq, bytes.clone()))
            .collect())
    }

    fn creation_time(&self) -> Timestamp {
        *self.creation_time.lock()
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
