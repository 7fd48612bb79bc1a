/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Wire decoder: framed FIX bytes to a tri-partitioned [`Message`].
//!
//! The decoder consumes exactly one framed message (the transport layer has
//! already delimited it by BodyLength) and enforces the structural contract:
//! BeginString (8) first, BodyLength (9) second, MsgType (35) third,
//! CheckSum (10) last, BodyLength covering the span from just past
//! `9=…<SOH>` up to and including the `<SOH>` before `10=`, and CheckSum
//! equal to the byte sum before `10=` mod 256.
//!
//! Values are sliced out of the input `Bytes` without copying.

use crate::checksum;
use bytes::Bytes;
use ferrofix_core::error::{DecodeError, FixError};
use ferrofix_core::field::Field;
use ferrofix_core::message::Message;
use ferrofix_core::tags;
use ferrofix_dictionary::classify::TagSection;
use ferrofix_dictionary::{Dictionary, TagClassifier};
use memchr::memchr;

/// SOH (0x01) field delimiter.
pub const SOH: u8 = 0x01;

/// A raw field located within the input buffer.
struct RawField {
    tag: u32,
    /// Value byte range within the input.
    start: usize,
    end: usize,
}

/// Decodes framed FIX messages into [`Message`] values.
#[derive(Debug, Clone)]
pub struct MessageDecoder {
    classifier: TagClassifier,
    validate_checksum: bool,
}

impl MessageDecoder {
    /// Creates a decoder with the standard tag classification tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classifier: TagClassifier::standard(),
            validate_checksum: true,
        }
    }

    /// Creates a decoder with a custom classifier (from a data dictionary).
    #[must_use]
    pub fn with_classifier(classifier: TagClassifier) -> Self {
        Self {
            classifier,
            validate_checksum: true,
        }
    }

    /// Disables checksum verification (for replayed or pre-verified input).
    #[must_use]
    pub const fn without_checksum_validation(mut self) -> Self {
        self.validate_checksum = false;
        self
    }

    /// Decodes one framed message.
    ///
    /// # Errors
    /// Returns `DecodeError` if the frame violates the structural contract.
    pub fn decode(&self, input: &Bytes) -> Result<Message, DecodeError> {
        let mut offset = 0usize;
        let mut raw_fields: Vec<RawField> = Vec::with_capacity(16);

        while offset < input.len() {
            let field = next_field(input, &mut offset)?;
            let is_checksum = field.tag == tags::CHECK_SUM;
            raw_fields.push(field);
            if is_checksum {
                break;
            }
        }

        let Some(last) = raw_fields.last() else {
            return Err(DecodeError::Incomplete);
        };
        if last.tag != tags::CHECK_SUM {
            return Err(DecodeError::Incomplete);
        }
        if offset < input.len() {
            return Err(DecodeError::ChecksumNotLast);
        }

        // Positional contract on the first three fields.
        if raw_fields.first().map(|f| f.tag) != Some(tags::BEGIN_STRING) {
            return Err(DecodeError::BeginStringNotFirst);
        }
        if raw_fields.get(1).map(|f| f.tag) != Some(tags::BODY_LENGTH) {
            return Err(DecodeError::BodyLengthNotSecond);
        }
        if raw_fields.get(2).map(|f| f.tag) != Some(tags::MSG_TYPE) {
            return Err(DecodeError::MsgTypeNotThird);
        }

        let body_length_field = &raw_fields[1];
        let declared_len = parse_uint(&input[body_length_field.start..body_length_field.end])
            .ok_or_else(|| DecodeError::InvalidValue {
                tag: tags::BODY_LENGTH,
                reason: "BodyLength is not a number".to_string(),
            })?;

        // Body span: just past "9=…<SOH>" through the SOH before "10=".
        let body_start = body_length_field.end + 1;
        let checksum_field = &raw_fields[raw_fields.len() - 1];
        let checksum_label_start = checksum_field.start - 3; // "10="
        let actual_len = checksum_label_start - body_start;
        if declared_len != actual_len {
            return Err(DecodeError::BodyLengthMismatch {
                declared: declared_len,
                actual: actual_len,
            });
        }

        if self.validate_checksum {
            let declared = checksum::parse(&input[checksum_field.start..checksum_field.end])
                .ok_or_else(|| DecodeError::InvalidValue {
                    tag: tags::CHECK_SUM,
                    reason: "CheckSum must be three digits in 000..=255".to_string(),
                })?;
            let computed = checksum::checksum(&input[..checksum_label_start]);
            if computed != declared {
                return Err(DecodeError::ChecksumMismatch { computed, declared });
            }
        }

        let mut msg = Message::new();
        for raw in &raw_fields {
            // BodyLength and CheckSum are derived; validated above, not stored.
            if raw.tag == tags::BODY_LENGTH || raw.tag == tags::CHECK_SUM {
                continue;
            }
            let field = Field::new(raw.tag, input.slice(raw.start..raw.end));
            match self.classifier.section(raw.tag) {
                TagSection::Header => msg.header.push(field),
                TagSection::Body => msg.body.push(field),
                TagSection::Trailer => msg.trailer.push(field),
            }
        }
        Ok(msg)
    }

    /// Decodes one framed message and validates it against the data
    /// dictionaries: the transport dictionary for admin messages, the
    /// application dictionary for everything else.
    ///
    /// # Errors
    /// Returns `FixError::Decode` for structural failures and
    /// `FixError::Reject` when dictionary validation fails.
    pub fn decode_validated(
        &self,
        input: &Bytes,
        transport_dict: &Dictionary,
        app_dict: &Dictionary,
    ) -> Result<Message, FixError> {
        let msg = self.decode(input)?;
        let dict = if msg.is_admin() {
            transport_dict
        } else {
            app_dict
        };
        dict.validate(&msg)?;
        Ok(msg)
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the next `tag=value<SOH>` unit starting at `*offset`.
fn next_field(input: &Bytes, offset: &mut usize) -> Result<RawField, DecodeError> {
    let remaining = &input[*offset..];
    let eq = memchr(b'=', remaining).ok_or(DecodeError::Incomplete)?;
    let tag_bytes = &remaining[..eq];
    let tag = parse_uint(tag_bytes)
        .and_then(|t| u32::try_from(t).ok())
        .filter(|&t| t > 0)
        .ok_or_else(|| DecodeError::MalformedTag(String::from_utf8_lossy(tag_bytes).into_owned()))?;

    let value_offset = eq + 1;
    let soh = memchr(SOH, &remaining[value_offset..]).ok_or(DecodeError::Incomplete)?;

    let start = *offset + value_offset;
    let end = start + soh;
    *offset = end + 1;
    Ok(RawField { tag, start, end })
}

/// Parses ASCII digits into a usize; `None` on empty or non-digit input.
fn parse_uint(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() || bytes.len() > 12 {
        return None;
    }
    let mut value = 0usize;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(usize::from(b - b'0'))?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrofix_core::message::MsgType;

    /// Builds a framed message with correct BodyLength and CheckSum.
    fn frame(begin_string: &str, payload: &str) -> Bytes {
        let head = format!("8={begin_string}\x019={}\x01", payload.len());
        let framed = format!("{head}{payload}");
        let sum = checksum::checksum(framed.as_bytes());
        let rendered = checksum::render(sum);
        Bytes::from(format!(
            "{framed}10={}\x01",
            std::str::from_utf8(&rendered).unwrap()
        ))
    }

    #[test]
    fn decodes_heartbeat() {
        let input = frame("FIX.4.4", "35=0\x0134=2\x0149=BANK\x0156=EXCH\x01112=PING\x01");
        let msg = MessageDecoder::new().decode(&input).unwrap();

        assert_eq!(msg.msg_type().unwrap(), MsgType::Heartbeat);
        assert_eq!(msg.seq_num().unwrap(), 2);
        assert_eq!(msg.header.get_str(tags::SENDER_COMP_ID), Some("BANK"));
        assert_eq!(msg.header.get_str(tags::TARGET_COMP_ID), Some("EXCH"));
        // TestReqID is a body field; BodyLength and CheckSum are dropped.
        assert_eq!(msg.body.get_str(tags::TEST_REQ_ID), Some("PING"));
        assert!(!msg.header.contains(tags::BODY_LENGTH));
        assert!(!msg.trailer.contains(tags::CHECK_SUM));
    }

    #[test]
    fn begin_string_must_lead() {
        let input = Bytes::from_static(b"35=0\x018=FIX.4.4\x019=0\x0110=000\x01");
        assert_eq!(
            MessageDecoder::new().decode(&input).unwrap_err(),
            DecodeError::BeginStringNotFirst
        );
    }

    #[test]
    fn body_length_must_be_second() {
        let input = Bytes::from_static(b"8=FIX.4.4\x0135=0\x019=0\x0110=000\x01");
        assert_eq!(
            MessageDecoder::new().decode(&input).unwrap_err(),
            DecodeError::BodyLengthNotSecond
        );
    }

    #[test]
    fn msg_type_must_be_third() {
        let input = Bytes::from_static(b"8=FIX.4.4\x019=9\x0149=BANK\x0110=000\x01");
        let err = MessageDecoder::new()
            .without_checksum_validation()
            .decode(&input)
            .unwrap_err();
        assert_eq!(err, DecodeError::MsgTypeNotThird);
    }

    #[test]
    fn body_length_mismatch_detected() {
        let input = Bytes::from_static(b"8=FIX.4.4\x019=99\x0135=0\x0110=000\x01");
        let err = MessageDecoder::new()
            .without_checksum_validation()
            .decode(&input)
            .unwrap_err();
        assert!(matches!(err, DecodeError::BodyLengthMismatch { .. }));
    }

    #[test]
    fn checksum_mismatch_detected() {
        let good = frame("FIX.4.4", "35=0\x01");
        let mut tampered = good.to_vec();
        // Corrupt the BeginString value without updating the trailer.
        tampered[2] = b'G';
        let err = MessageDecoder::new()
            .decode(&Bytes::from(tampered))
            .unwrap_err();
        assert!(matches!(err, DecodeError::ChecksumMismatch { .. }));
    }

    #[test]
    fn trailing_fields_after_checksum_rejected() {
        let good = frame("FIX.4.2", "35=0\x01");
        let mut extended = good.to_vec();
        extended.extend_from_slice(b"58=late\x01");
        let err = MessageDecoder::new()
            .decode(&Bytes::from(extended))
            .unwrap_err();
        assert_eq!(err, DecodeError::ChecksumNotLast);
    }

    #[test]
    fn truncated_frame_is_incomplete() {
        let input = Bytes::from_static(b"8=FIX.4.4\x019=5\x0135=0\x01");
        assert_eq!(
            MessageDecoder::new().decode(&input).unwrap_err(),
            DecodeError::Incomplete
        );
    }

    #[test]
    fn malformed_tag_rejected() {
        let input = Bytes::from_static(b"8a=FIX.4.4\x019=5\x0135=0\x0110=000\x01");
        assert!(matches!(
            MessageDecoder::new().decode(&input).unwrap_err(),
            DecodeError::MalformedTag(_)
        ));
    }

    #[test]
    fn validated_decode_rejects_bad_logon() {
        use ferrofix_dictionary::Version;
        let dict = Dictionary::session_defaults(Version::Fix44);
        // Logon without HeartBtInt.
        let input = frame("FIX.4.4", "35=A\x0134=1\x0198=0\x01");
        let err = MessageDecoder::new()
            .decode_validated(&input, &dict, &dict)
            .unwrap_err();
        assert!(matches!(err, FixError::Reject(_)));
    }

    #[test]
    fn validated_decode_accepts_app_message() {
        use ferrofix_dictionary::Version;
        let dict = Dictionary::session_defaults(Version::Fix44);
        let input = frame("FIX.4.4", "35=D\x0134=3\x0155=EURUSD\x01");
        let msg = MessageDecoder::new()
            .decode_validated(&input, &dict, &dict)
            .unwrap();
        assert_eq!(msg.body.get_str(55), Some("EURUSD"));
    }
}
