/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message validation against a data dictionary.
//!
//! Validation runs after structural parsing and before the session's
//! sequence checks. Failures yield a [`MessageRejectError`] carrying the
//! offending tag and the reason the counterparty will see in tag 373.

use crate::schema::Dictionary;
use ferrofix_core::error::{MessageRejectError, RejectReason};
use ferrofix_core::message::Message;
use ferrofix_core::tags;

/// Reject reason code 16: incorrect NumInGroup count for a repeating group.
const INCORRECT_GROUP_COUNT: u32 = 16;

impl Dictionary {
    /// Validates a parsed message against this dictionary.
    ///
    /// Checks, in order: MsgType known, every field non-empty, required
    /// body fields present, body fields allowed for the message type,
    /// field values well-formed for their declared type, and repeating
    /// group counts consistent.
    ///
    /// # Errors
    /// Returns `MessageRejectError` describing the first failure.
    pub fn validate(&self, msg: &Message) -> Result<(), MessageRejectError> {
        let msg_type = msg
            .header
            .get_str(tags::MSG_TYPE)
            .ok_or_else(|| MessageRejectError::required_tag_missing(tags::MSG_TYPE))?
            .to_string();

        self.check_no_empty_values(msg, &msg_type)?;

        let Some(def) = self.message(&msg_type) else {
            if self.allow_unknown_message_types {
                return Ok(());
            }
            return Err(MessageRejectError::new(
                RejectReason::InvalidMsgType,
                format!("invalid message type: {msg_type}"),
            )
            .with_ref_msg_type(msg_type));
        };

        for &tag in &def.required {
            if !msg.body.contains(tag) {
                return Err(
                    MessageRejectError::required_tag_missing(tag).with_ref_msg_type(&def.msg_type)
                );
            }
        }

        for field in msg.body.iter() {
            if !def.allows(field.tag) {
                return Err(MessageRejectError::tag_not_defined(field.tag, &def.msg_type));
            }
            self.check_field_format(field.tag, &field.value, &msg_type)?;
        }

        for group in &def.groups {
            let Some(declared) = msg.body.get(group.count_tag) else {
                continue;
            };
            let declared: u64 =
                declared
                    .parse()
                    .map_err(|_| MessageRejectError::new(
                        RejectReason::IncorrectDataFormat,
                        format!("group count is not a number: tag {}", group.count_tag),
                    )
                    .with_ref_tag(group.count_tag))?;
            let actual = msg
                .body
                .iter()
                .filter(|f| f.tag == group.delimiter_tag)
                .count() as u64;
            if declared != actual {
                return Err(MessageRejectError::new(
                    RejectReason::Other(INCORRECT_GROUP_COUNT),
                    format!(
                        "incorrect NumInGroup count for repeating group: tag {}, declared {declared}, actual {actual}",
                        group.count_tag
                    ),
                )
                .with_ref_tag(group.count_tag)
                .with_ref_msg_type(msg_type));
            }
        }

        Ok(())
    }

    fn check_no_empty_values(
        &self,
        msg: &Message,
        msg_type: &str,
    ) -> Result<(), MessageRejectError> {
        for field in msg
            .header
            .iter()
            .chain(msg.body.iter())
            .chain(msg.trailer.iter())
        {
            if field.value.is_empty() {
                return Err(MessageRejectError::new(
                    RejectReason::TagSpecifiedWithoutValue,
                    format!("tag specified without a value: {}", field.tag),
                )
                .with_ref_tag(field.tag)
                .with_ref_msg_type(msg_type));
            }
        }
        Ok(())
    }

    fn check_field_format(
        &self,
        tag: u32,
        value: &[u8],
        msg_type: &str,
    ) -> Result<(), MessageRejectError> {
        let Some(def) = self.field(tag) else {
            return Ok(());
        };
        if def.field_type.is_integral() {
            let ok = !value.is_empty() && value.iter().all(u8::is_ascii_digit);
            if !ok {
                return Err(MessageRejectError::new(
                    RejectReason::IncorrectDataFormat,
                    format!("incorrect data format for value: tag {tag}"),
                )
                .with_ref_tag(tag)
                .with_ref_msg_type(msg_type));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GroupDef, MessageDef};
    use crate::version::Version;
    use ferrofix_core::message::MsgType;

    fn dict() -> Dictionary {
        Dictionary::session_defaults(Version::Fix44)
    }

    fn logon() -> Message {
        let mut msg = Message::of_type(&MsgType::Logon);
        msg.header.set_str(tags::BEGIN_STRING, "FIX.4.4");
        msg.body.set_uint(tags::ENCRYPT_METHOD, 0);
        msg.body.set_uint(tags::HEART_BT_INT, 30);
        msg
    }

    #[test]
    fn valid_logon_passes() {
        assert!(dict().validate(&logon()).is_ok());
    }

    #[test]
    fn missing_required_field() {
        let mut msg = logon();
        msg.body.remove(tags::HEART_BT_INT);
        let err = dict().validate(&msg).unwrap_err();
        assert_eq!(err.reason, RejectReason::RequiredTagMissing);
        assert_eq!(err.ref_tag_id, Some(tags::HEART_BT_INT));
    }

    #[test]
    fn undefined_body_tag_for_message() {
        let mut msg = logon();
        msg.body.set_str(55, "EURUSD");
        let err = dict().validate(&msg).unwrap_err();
        assert_eq!(err.reason, RejectReason::TagNotDefinedForMessage);
        assert_eq!(err.ref_tag_id, Some(55));
    }

    #[test]
    fn empty_value_rejected() {
        let mut msg = logon();
        msg.body.set_str(tags::TEXT, "");
        let err = dict().validate(&msg).unwrap_err();
        assert_eq!(err.reason, RejectReason::TagSpecifiedWithoutValue);
        assert_eq!(err.ref_tag_id, Some(tags::TEXT));
    }

    #[test]
    fn integral_field_format_enforced() {
        let mut msg = logon();
        msg.body.set_str(tags::HEART_BT_INT, "thirty");
        let err = dict().validate(&msg).unwrap_err();
        assert_eq!(err.reason, RejectReason::IncorrectDataFormat);
    }

    #[test]
    fn unknown_msg_type_passes_when_allowed() {
        let mut msg = Message::of_type(&MsgType::Other("D".into()));
        msg.body.set_str(55, "EURUSD");
        assert!(dict().validate(&msg).is_ok());
    }

    #[test]
    fn unknown_msg_type_rejected_when_strict() {
        let mut d = dict();
        d.allow_unknown_message_types = false;
        let msg = Message::of_type(&MsgType::Other("ZZ".into()));
        let err = d.validate(&msg).unwrap_err();
        assert_eq!(err.reason, RejectReason::InvalidMsgType);
        assert_eq!(err.ref_msg_type.as_deref(), Some("ZZ"));
    }

    #[test]
    fn group_count_mismatch() {
        let mut d = dict();
        d.add_message(
            MessageDef::new("V", "MarketDataRequest", vec![], vec![]).with_group(GroupDef {
                count_tag: 146,
                delimiter_tag: 55,
            }),
        );
        let mut msg = Message::of_type(&MsgType::Other("V".into()));
        msg.body.set_uint(146, 2);
        msg.body.push(ferrofix_core::field::Field::new(55, &b"EURUSD"[..]));
        let err = d.validate(&msg).unwrap_err();
        assert_eq!(err.reason, RejectReason::Other(INCORRECT_GROUP_COUNT));

        msg.body.push(ferrofix_core::field::Field::new(55, &b"USDJPY"[..]));
        assert!(d.validate(&msg).is_ok());
    }
}
