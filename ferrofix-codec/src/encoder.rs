/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Wire encoder: a tri-partitioned [`Message`] to framed FIX bytes.
//!
//! Serialization order is canonical regardless of insertion order:
//! - header: BeginString (8), BodyLength (9), MsgType (35), then the
//!   remaining header fields ascending by tag
//! - body: insertion order (repeating groups stay intact)
//! - trailer: ascending by tag, CheckSum (10) forced last
//!
//! BodyLength and CheckSum are derived while encoding; any stale values in
//! the sub-maps are ignored.

use crate::checksum;
use crate::decoder::SOH;
use bytes::{BufMut, BytesMut};
use ferrofix_core::error::EncodeError;
use ferrofix_core::field::Field;
use ferrofix_core::message::Message;
use ferrofix_core::tags;

/// Serializes a message to framed wire bytes.
///
/// # Errors
/// Returns `EncodeError::MissingField` if the header lacks BeginString (8)
/// or MsgType (35).
pub fn encode_message(msg: &Message) -> Result<BytesMut, EncodeError> {
    let begin_string = msg
        .header
        .get_bytes(tags::BEGIN_STRING)
        .ok_or(EncodeError::MissingField {
            tag: tags::BEGIN_STRING,
        })?;
    let msg_type = msg
        .header
        .get_bytes(tags::MSG_TYPE)
        .ok_or(EncodeError::MissingField {
            tag: tags::MSG_TYPE,
        })?;

    // Everything between "9=…<SOH>" and "10=" is counted by BodyLength.
    let mut counted = BytesMut::with_capacity(256);
    put_field(&mut counted, tags::MSG_TYPE, msg_type);

    for field in msg.header.sorted_by_tag() {
        if matches!(
            field.tag,
            tags::BEGIN_STRING | tags::BODY_LENGTH | tags::MSG_TYPE
        ) {
            continue;
        }
        put_field(&mut counted, field.tag, &field.value);
    }

    for field in msg.body.iter() {
        put_field(&mut counted, field.tag, &field.value);
    }

    for field in msg.trailer.sorted_by_tag() {
        if field.tag == tags::CHECK_SUM {
            continue;
        }
        put_field(&mut counted, field.tag, &field.value);
    }

    let mut out = BytesMut::with_capacity(counted.len() + 32);
    out.put_slice(b"8=");
    out.put_slice(begin_string);
    out.put_u8(SOH);
    out.put_slice(b"9=");
    let mut len_buf = itoa::Buffer::new();
    out.put_slice(len_buf.format(counted.len()).as_bytes());
    out.put_u8(SOH);
    out.put_slice(&counted);

    let sum = checksum::checksum(&out);
    out.put_slice(b"10=");
    out.put_slice(&checksum::render(sum));
    out.put_u8(SOH);

    Ok(out)
}

fn put_field(buf: &mut BytesMut, tag: u32, value: &[u8]) {
    let mut tag_buf = itoa::Buffer::new();
    buf.put_slice(tag_buf.format(tag).as_bytes());
    buf.put_u8(b'=');
    buf.put_slice(value);
    buf.put_u8(SOH);
}

/// Serializes a single field for callers composing partial payloads.
pub fn append_field(buf: &mut BytesMut, field: &Field) {
    put_field(buf, field.tag, &field.value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::MessageDecoder;
    use bytes::Bytes;
    use ferrofix_core::message::MsgType;

    fn sample() -> Message {
        let mut msg = Message::of_type(&MsgType::Heartbeat);
        msg.header.set_str(tags::BEGIN_STRING, "FIX.4.4");
        msg.header.set_str(tags::SENDER_COMP_ID, "BANK");
        msg.header.set_str(tags::TARGET_COMP_ID, "EXCH");
        msg.header.set_uint(tags::MSG_SEQ_NUM, 2);
        msg.body.set_str(tags::TEST_REQ_ID, "PING");
        msg
    }

    #[test]
    fn header_leads_with_8_9_35() {
        let out = encode_message(&sample()).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.starts_with("8=FIX.4.4\x019="));
        let after_len = text.splitn(3, '\x01').nth(2).unwrap();
        assert!(after_len.starts_with("35=0\x01"));
    }

    #[test]
    fn remaining_header_fields_sorted() {
        let out = encode_message(&sample()).unwrap();
        let text = String::from_utf8_lossy(&out);
        let pos_34 = text.find("34=2").unwrap();
        let pos_49 = text.find("49=BANK").unwrap();
        let pos_56 = text.find("56=EXCH").unwrap();
        assert!(pos_34 < pos_49 && pos_49 < pos_56);
    }

    #[test]
    fn checksum_trails_and_verifies() {
        let out = encode_message(&sample()).unwrap();
        let text = String::from_utf8_lossy(&out);
        let tail_start = text.rfind("10=").unwrap();
        assert_eq!(text.len() - tail_start, 7);

        let sum = checksum::checksum(&out[..tail_start]);
        assert_eq!(&out[tail_start + 3..tail_start + 6], checksum::render(sum));
    }

    #[test]
    fn body_length_counts_exact_span() {
        let out = encode_message(&sample()).unwrap();
        let text = String::from_utf8_lossy(&out);
        let len_start = text.find("9=").unwrap() + 2;
        let len_end = len_start + text[len_start..].find('\x01').unwrap();
        let declared: usize = text[len_start..len_end].parse().unwrap();
        let body_start = len_end + 1;
        let body_end = text.rfind("10=").unwrap();
        assert_eq!(declared, body_end - body_start);
    }

    #[test]
    fn missing_begin_string_fails() {
        let msg = Message::of_type(&MsgType::Heartbeat);
        assert_eq!(
            encode_message(&msg).unwrap_err(),
            EncodeError::MissingField {
                tag: tags::BEGIN_STRING
            }
        );
    }

    #[test]
    fn missing_msg_type_fails() {
        let mut msg = Message::new();
        msg.header.set_str(tags::BEGIN_STRING, "FIX.4.4");
        assert_eq!(
            encode_message(&msg).unwrap_err(),
            EncodeError::MissingField {
                tag: tags::MSG_TYPE
            }
        );
    }

    #[test]
    fn parse_serialize_roundtrip() {
        let msg = sample();
        let wire: Bytes = encode_message(&msg).unwrap().freeze();
        let parsed = MessageDecoder::new().decode(&wire).unwrap();
        assert_eq!(parsed, msg);

        // And a second pass is byte-stable.
        let wire2 = encode_message(&parsed).unwrap();
        assert_eq!(&wire2[..], &wire[..]);
    }

    #[test]
    fn body_keeps_insertion_order() {
        let mut msg = Message::of_type(&MsgType::Other("D".into()));
        msg.header.set_str(tags::BEGIN_STRING, "FIX.4.2");
        msg.body.set_str(55, "EURUSD");
        msg.body.set_str(54, "1");
        msg.body.set_str(38, "100");
        let out = encode_message(&msg).unwrap();
        let text = String::from_utf8_lossy(&out);
        let p55 = text.find("55=").unwrap();
        let p54 = text.find("54=").unwrap();
        let p38 = text.find("38=").unwrap();
        assert!(p55 < p54 && p54 < p38);
    }
}
