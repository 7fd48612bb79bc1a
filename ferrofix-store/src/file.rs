/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! File-backed message store.
//!
//! One directory per session, filename prefix `Sender-Target[-Qualifier]`:
//! - `<prefix>.body`: concatenated framed messages, append-only
//! - `<prefix>.header`: one `seq,offset,len` line per saved message
//! - `<prefix>.seqnums`: fixed-width sender/target counters, rewritten in place
//! - `<prefix>.session`: session epoch as milliseconds since Unix epoch
//!
//! Counter writes are flushed to disk before returning. `reset` truncates
//! the log files and replaces `.session` via a rename.

use crate::traits::MessageStore;
use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::StoreError;
use ferrofix_core::types::Timestamp;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

fn io_err(err: std::io::Error) -> StoreError {
    StoreError::Io(err.to_string())
}

struct Inner {
    body: File,
    header: File,
    body_len: u64,
    index: BTreeMap<u64, (u64, u64)>,
    sender_seq: u64,
    target_seq: u64,
    creation_time: Timestamp,
}

/// Append-only file-backed message store.
pub struct FileStore {
    body_path: PathBuf,
    header_path: PathBuf,
    seqnums_path: PathBuf,
    session_path: PathBuf,
    inner: Mutex<Inner>,
}

impl FileStore {
    /// Opens (or creates) the store for a session.
    ///
    /// # Arguments
    /// * `dir` - Directory holding this session's files
    /// * `prefix` - Filename prefix, `Sender-Target[-Qualifier]`
    ///
    /// # Errors
    /// Returns `StoreError::Io` on filesystem failures and
    /// `StoreError::Corrupted` if the index does not parse.
    pub fn open(dir: impl AsRef<Path>, prefix: &str) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let body_path = dir.join(format!("{prefix}.body"));
        let header_path = dir.join(format!("{prefix}.header"));
        let seqnums_path = dir.join(format!("{prefix}.seqnums"));
        let session_path = dir.join(format!("{prefix}.session"));

        let body = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&body_path)
            .map_err(io_err)?;
        let header = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&header_path)
            .map_err(io_err)?;

        let body_len = body.metadata().map_err(io_err)?.len();
        let index = load_index(&header_path)?;
        let (sender_seq, target_seq) = match load_seqnums(&seqnums_path)? {
            Some(pair) => pair,
            None => {
                write_seqnums(&seqnums_path, 1, 1)?;
                (1, 1)
            }
        };
        let creation_time = match load_session(&session_path)? {
            Some(ts) => ts,
            None => {
                let now = Timestamp::now();
                write_session(&session_path, now)?;
                now
            }
        };

        Ok(Self {
            body_path,
            header_path,
            seqnums_path,
            session_path,
            inner: Mutex::new(Inner {
                body,
                header,
                body_len,
                index,
                sender_seq,
                target_seq,
                creation_time,
            }),
        })
    }

    /// Returns the number of indexed messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.lock().index.len()
    }
}

fn load_index(path: &Path) -> Result<BTreeMap<u64, (u64, u64)>, StoreError> {
    let mut text = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut text))
        .map_err(io_err)?;

    let mut index = BTreeMap::new();
    for line in text.lines() {
        let mut parts = line.splitn(3, ',');
        let entry = (
            parts.next().and_then(|s| s.parse::<u64>().ok()),
            parts.next().and_then(|s| s.parse::<u64>().ok()),
            parts.next().and_then(|s| s.parse::<u64>().ok()),
        );
        let (Some(seq), Some(offset), Some(len)) = entry else {
            return Err(StoreError::Corrupted {
                reason: format!("bad index line: '{line}'"),
            });
        };
        index.insert(seq, (offset, len));
    }
    Ok(index)
}

fn load_seqnums(path: &Path) -> Result<Option<(u64, u64)>, StoreError> {
    let mut text = String::new();
    match File::open(path) {
        Ok(mut f) => f.read_to_string(&mut text).map_err(io_err)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(err)),
    };
    let mut parts = text.trim().splitn(2, ':');
    let pair = (
        parts.next().and_then(|s| s.trim().parse::<u64>().ok()),
        parts.next().and_then(|s| s.trim().parse::<u64>().ok()),
    );
    let (Some(sender), Some(target)) = pair else {
        return Err(StoreError::Corrupted {
            reason: format!("bad seqnums content: '{}'", text.trim()),
        });
    };
    Ok(Some((sender, target)))
}

/// Fixed-width rewrite in place; the record never shrinks, so a seek to 0
/// plus overwrite is safe without truncation.
fn write_seqnums(path: &Path, sender: u64, target: u64) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .map_err(io_err)?;
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    file.write_all(format!("{sender:020} : {target:020}\n").as_bytes())
        .map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

fn load_session(path: &Path) -> Result<Option<Timestamp>, StoreError> {
    let mut text = String::new();
    match File::open(path) {
        Ok(mut f) => f.read_to_string(&mut text).map_err(io_err)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(err)),
    };
    let millis = text
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::Corrupted {
            reason: format!("bad session content: '{}'", text.trim()),
        })?;
    Ok(Some(Timestamp::from_millis(millis)))
}

/// Replaces the session file via a temp-write plus rename.
fn write_session(path: &Path, ts: Timestamp) -> Result<(), StoreError> {
    let tmp = path.with_extension("session.tmp");
    let mut file = File::create(&tmp).map_err(io_err)?;
    file.write_all(format!("{}\n", ts.as_millis()).as_bytes())
        .map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}

#[async_trait]
impl MessageStore for FileStore {
    async fn refresh(&self) -> Result<(), StoreError> {
        let index = load_index(&self.header_path)?;
        let seqnums = load_seqnums(&self.seqnums_path)?;
        let session = load_session(&self.session_path)?;

        let mut inner = self.inner.lock();
        inner.index = index;
        if let Some((sender, target)) = seqnums {
            inner.sender_seq = sender;
            inner.target_seq = target;
        }
        if let Some(ts) = session {
            inner.creation_time = ts;
        }
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.body.set_len(0).map_err(io_err)?;
        inner.header.set_len(0).map_err(io_err)?;
        inner.body.sync_all().map_err(io_err)?;
        inner.header.sync_all().map_err(io_err)?;
        inner.body_len = 0;
        inner.index.clear();
        inner.sender_seq = 1;
        inner.target_seq = 1;
        write_seqnums(&self.seqnums_path, 1, 1)?;
        let now = Timestamp::now();
        write_session(&self.session_path, now)?;
        inner.creation_time = now;
        Ok(())
    }

    fn next_sender_seq(&self) -> u64 {
        self.inner.lock().sender_seq
    }

    fn next_target_seq(&self) -> u64 {
        self.inner.lock().target_seq
    }

    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.sender_seq = seq;
        write_seqnums(&self.seqnums_path, inner.sender_seq, inner.target_seq)
    }

    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.target_seq = seq;
        write_seqnums(&self.seqnums_path, inner.sender_seq, inner.target_seq)
    }

    async fn save_message(&self, seq: u64, bytes: Bytes) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let offset = inner.body_len;
        let len = bytes.len() as u64;

        inner.body.write_all(&bytes).map_err(|err| StoreError::SaveFailed {
            seq,
            reason: err.to_string(),
        })?;
        inner.body.sync_all().map_err(io_err)?;

        let line = format!("{seq},{offset},{len}\n");
        inner.header.write_all(line.as_bytes()).map_err(io_err)?;
        inner.header.sync_all().map_err(io_err)?;

        inner.body_len += len;
        inner.index.insert(seq, (offset, len));
        Ok(())
    }

    async fn get_messages(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError> {
        let end = if end == 0 { u64::MAX } else { end };
        let entries: Vec<(u64, u64, u64)> = {
            let inner = self.inner.lock();
            inner
                .index
                .range(begin..=end)
                .map(|(seq, (offset, len))| (*seq, *offset, *len))
                .collect()
        };

        let mut body = File::open(&self.body_path).map_err(io_err)?;
        let mut out = Vec::with_capacity(entries.len());
        for (seq, offset, len) in entries {
            body.seek(SeekFrom::Start(offset)).map_err(io_err)?;
            let mut buf = vec![0u8; len as usize];
            body.read_exact(&mut buf).map_err(|_| StoreError::Corrupted {
                reason: format!("body shorter than index for seq {seq}"),
            })?;
            out.push((seq, Bytes::from(buf)));
        }
        Ok(out)
    }

    fn creation_time(&self) -> Timestamp {
        self.inner.lock().creation_time
    }

    async fn close(&self) -> Result<(), StoreError> {
        let inner = self.inner.lock();
        inner.body.sync_all().map_err(io_err)?;
        inner.header.sync_all().map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir() -> PathBuf {
        let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "ferrofix-store-test-{}-{n}",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn save_close_refresh_returns_same_bytes() {
        let dir = scratch_dir();
        let store = FileStore::open(&dir, "BANK-EXCH").unwrap();
        store
            .save_message(1, Bytes::from_static(b"8=FIX.4.4\x01..."))
            .await
            .unwrap();
        store.set_next_sender_seq(2).await.unwrap();
        store.close().await.unwrap();
        drop(store);

        let store = FileStore::open(&dir, "BANK-EXCH").unwrap();
        store.refresh().await.unwrap();
        assert_eq!(store.next_sender_seq(), 2);
        let msgs = store.get_messages(1, 1).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(&msgs[0].1[..], b"8=FIX.4.4\x01...");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn counters_survive_reopen() {
        let dir = scratch_dir();
        {
            let store = FileStore::open(&dir, "A-B").unwrap();
            store.set_next_sender_seq(17).await.unwrap();
            store.set_next_target_seq(9).await.unwrap();
        }
        let store = FileStore::open(&dir, "A-B").unwrap();
        assert_eq!(store.next_sender_seq(), 17);
        assert_eq!(store.next_target_seq(), 9);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let dir = scratch_dir();
        let store = FileStore::open(&dir, "A-B").unwrap();
        store.save_message(1, Bytes::from_static(b"one")).await.unwrap();
        store.save_message(2, Bytes::from_static(b"two")).await.unwrap();
        store.set_next_sender_seq(3).await.unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.next_sender_seq(), 1);
        assert_eq!(store.next_target_seq(), 1);
        assert_eq!(store.message_count(), 0);
        assert!(store.get_messages(1, 0).await.unwrap().is_empty());

        // Idempotent.
        store.reset().await.unwrap();
        assert_eq!(store.next_sender_seq(), 1);
        assert_eq!(store.message_count(), 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn range_lookup_uses_index() {
        let dir = scratch_dir();
        let store = FileStore::open(&dir, "A-B").unwrap();
        for seq in 1..=5u64 {
            store
                .save_message(seq, Bytes::from(format!("msg{seq}")))
                .await
                .unwrap();
        }

        let msgs = store.get_messages(2, 4).await.unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(&msgs[0].1[..], b"msg2");
        assert_eq!(&msgs[2].1[..], b"msg4");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn corrupted_index_is_detected() {
        let dir = scratch_dir();
        {
            let store = FileStore::open(&dir, "A-B").unwrap();
            store.save_message(1, Bytes::from_static(b"x")).await.unwrap();
        }
        std::fs::write(dir.join("A-B.header"), b"not,an\n").unwrap();
        assert!(matches!(
            FileStore::open(&dir, "A-B"),
            Err(StoreError::Corrupted { .. })
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
