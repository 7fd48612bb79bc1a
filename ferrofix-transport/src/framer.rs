/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for FIX stream framing.
//!
//! A frame is `8=...<SOH>9=<len><SOH>` + `len` body bytes + the trailing
//! `10=XXX<SOH>` checksum field. The framer computes the frame end from
//! BodyLength, waits for the full frame, and hands the bytes up unparsed.
//! Outbound frames pass through untouched.

use bytes::{BufMut, Bytes, BytesMut};
use memchr::memchr;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// SOH field delimiter.
const SOH: u8 = 0x01;

/// Fixed size of the trailing `10=XXX<SOH>` field.
const TRAILER_LEN: usize = 7;

/// Smallest conceivable frame; anything shorter waits for more bytes.
const MIN_FRAME_LEN: usize = 20;

/// Default maximum frame size in bytes.
const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Framing failures. Any of these poisons the stream: the connection must
/// be dropped since frame boundaries are lost.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FramerError {
    /// The stream does not start with `8=`.
    #[error("stream does not start with BeginString")]
    MissingBeginString,

    /// The second field is not `9=`.
    #[error("BodyLength (9) does not follow BeginString")]
    MissingBodyLength,

    /// BodyLength is not a parseable number.
    #[error("unparseable BodyLength value")]
    BadBodyLength,

    /// Frame exceeds the configured maximum.
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Computed frame size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Underlying transport failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FramerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Splits a byte stream into complete FIX frames.
#[derive(Debug, Clone)]
pub struct FixFramer {
    max_frame: usize,
}

impl FixFramer {
    /// Creates a framer with the default 1 MiB frame cap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub const fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }
}

impl Default for FixFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FixFramer {
    type Item = Bytes;
    type Error = FramerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_FRAME_LEN {
            return Ok(None);
        }
        if &src[..2] != b"8=" {
            return Err(FramerError::MissingBeginString);
        }

        let Some(begin_soh) = memchr(SOH, src) else {
            return Ok(None);
        };

        let len_field = begin_soh + 1;
        if src.len() < len_field + 2 {
            return Ok(None);
        }
        if &src[len_field..len_field + 2] != b"9=" {
            return Err(FramerError::MissingBodyLength);
        }

        let Some(len_soh) = memchr(SOH, &src[len_field..]).map(|pos| len_field + pos) else {
            return Ok(None);
        };

        let body_len: usize = std::str::from_utf8(&src[len_field + 2..len_soh])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(FramerError::BadBodyLength)?;

        let frame_len = len_soh + 1 + body_len + TRAILER_LEN;
        if frame_len > self.max_frame {
            return Err(FramerError::FrameTooLarge {
                size: frame_len,
                max: self.max_frame,
            });
        }
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(frame_len).freeze()))
    }
}

impl Encoder<Bytes> for FixFramer {
    type Error = FramerError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &str) -> Vec<u8> {
        let head = format!("8=FIX.4.4\x019={}\x01", body.len());
        let framed = format!("{head}{body}");
        let sum: u32 = framed.bytes().map(u32::from).sum();
        format!("{framed}10={:03}\x01", sum % 256).into_bytes()
    }

    #[test]
    fn complete_frame_is_split() {
        let wire = frame("35=0\x0134=2\x01");
        let mut buf = BytesMut::from(&wire[..]);
        let mut framer = FixFramer::new();

        let out = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&out[..], &wire[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits() {
        let wire = frame("35=0\x0134=2\x01");
        let mut buf = BytesMut::from(&wire[..wire.len() - 3]);
        let mut framer = FixFramer::new();

        assert!(framer.decode(&mut buf).unwrap().is_none());
        // Remaining bytes arrive.
        buf.extend_from_slice(&wire[wire.len() - 3..]);
        assert!(framer.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn two_frames_split_in_order() {
        let first = frame("35=0\x0134=2\x01");
        let second = frame("35=1\x0134=3\x01112=PING\x01");
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);
        let mut framer = FixFramer::new();

        let a = framer.decode(&mut buf).unwrap().unwrap();
        let b = framer.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&a[..], &first[..]);
        assert_eq!(&b[..], &second[..]);
        assert!(framer.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn garbage_prefix_poisons_stream() {
        let mut buf = BytesMut::from(&b"9=FIX.4.4\x01lorem ipsum dolor"[..]);
        let mut framer = FixFramer::new();
        assert_eq!(
            framer.decode(&mut buf).unwrap_err(),
            FramerError::MissingBeginString
        );
    }

    #[test]
    fn unparseable_length_is_an_error() {
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=abc\x0135=0\x0110=000\x01"[..]);
        let mut framer = FixFramer::new();
        assert_eq!(
            framer.decode(&mut buf).unwrap_err(),
            FramerError::BadBodyLength
        );
    }

    #[test]
    fn oversized_frame_is_capped() {
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=999999\x0135=0\x01xxxxxxxx"[..]);
        let mut framer = FixFramer::new().with_max_frame(1024);
        assert!(matches!(
            framer.decode(&mut buf).unwrap_err(),
            FramerError::FrameTooLarge { .. }
        ));
    }

    #[test]
    fn encode_is_passthrough() {
        let wire = Bytes::from(frame("35=0\x01"));
        let mut dst = BytesMut::new();
        let mut framer = FixFramer::new();
        framer.encode(wire.clone(), &mut dst).unwrap();
        assert_eq!(&dst[..], &wire[..]);
    }
}
