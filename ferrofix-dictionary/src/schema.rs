/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Data-dictionary schema: field, group, and message definitions.

use crate::classify::TagClassifier;
use crate::version::Version;
use ferrofix_core::tags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// FIX field data type, trimmed to what validation distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Integer value.
    Int,
    /// Sequence number (>= 1).
    SeqNum,
    /// Byte length of a companion data field.
    Length,
    /// Entry count of a repeating group.
    NumInGroup,
    /// Single character.
    Char,
    /// Boolean (Y/N).
    Boolean,
    /// Free-form string.
    String,
    /// UTC timestamp.
    UtcTimestamp,
    /// Raw data.
    Data,
}

impl FieldType {
    /// Returns true if values of this type must parse as unsigned integers.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Int | Self::SeqNum | Self::Length | Self::NumInGroup)
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field tag number.
    pub tag: u32,
    /// Field name as given in the specification.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(tag: u32, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            tag,
            name: name.into(),
            field_type,
        }
    }
}

/// Definition of a repeating group within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDef {
    /// Tag carrying the entry count (NumInGroup).
    pub count_tag: u32,
    /// First tag of each entry; its occurrences delimit entries.
    pub delimiter_tag: u32,
}

/// Definition of a message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDef {
    /// Wire MsgType value (e.g. "A").
    pub msg_type: String,
    /// Message name.
    pub name: String,
    /// Body tags that must be present.
    pub required: Vec<u32>,
    /// Body tags the message may carry (required tags included). Empty
    /// means the body is unconstrained.
    pub allowed: Vec<u32>,
    /// Repeating groups in the body.
    pub groups: Vec<GroupDef>,
}

impl MessageDef {
    /// Creates a message definition with required and allowed body tags.
    #[must_use]
    pub fn new(
        msg_type: impl Into<String>,
        name: impl Into<String>,
        required: Vec<u32>,
        allowed: Vec<u32>,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            name: name.into(),
            required,
            allowed,
            groups: Vec::new(),
        }
    }

    /// Adds a repeating group.
    #[must_use]
    pub fn with_group(mut self, group: GroupDef) -> Self {
        self.groups.push(group);
        self
    }

    /// Returns true if the tag may appear in the body of this message.
    #[must_use]
    pub fn allows(&self, tag: u32) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&tag)
    }
}

/// A complete data dictionary for one FIX version.
#[derive(Debug, Clone)]
pub struct Dictionary {
    /// The FIX version this dictionary describes.
    pub version: Version,
    /// Known fields by tag.
    pub fields: HashMap<u32, FieldDef>,
    /// Known messages by wire MsgType.
    pub messages: HashMap<String, MessageDef>,
    /// Header/trailer classification tables.
    pub classifier: TagClassifier,
    /// Whether message types absent from `messages` pass validation.
    /// The built-in session dictionary sets this so application traffic
    /// flows through unvalidated; a full application dictionary clears it.
    pub allow_unknown_message_types: bool,
}

impl Dictionary {
    /// Creates an empty dictionary for the given version.
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self {
            version,
            fields: HashMap::new(),
            messages: HashMap::new(),
            classifier: TagClassifier::standard(),
            allow_unknown_message_types: true,
        }
    }

    /// Registers a field definition.
    pub fn add_field(&mut self, def: FieldDef) {
        self.fields.insert(def.tag, def);
    }

    /// Registers a message definition.
    pub fn add_message(&mut self, def: MessageDef) {
        self.messages.insert(def.msg_type.clone(), def);
    }

    /// Looks up a message definition by wire MsgType.
    #[must_use]
    pub fn message(&self, msg_type: &str) -> Option<&MessageDef> {
        self.messages.get(msg_type)
    }

    /// Looks up a field definition by tag.
    #[must_use]
    pub fn field(&self, tag: u32) -> Option<&FieldDef> {
        self.fields.get(&tag)
    }

    /// Builds the built-in session-level dictionary: the administrative
    /// messages every FIX version shares, with their required fields.
    #[must_use]
    pub fn session_defaults(version: Version) -> Self {
        let mut dict = Self::new(version);

        for (tag, name, ftype) in [
            (tags::BEGIN_SEQ_NO, "BeginSeqNo", FieldType::SeqNum),
            (tags::END_SEQ_NO, "EndSeqNo", FieldType::SeqNum),
            (tags::MSG_SEQ_NUM, "MsgSeqNum", FieldType::SeqNum),
            (tags::NEW_SEQ_NO, "NewSeqNo", FieldType::SeqNum),
            (tags::REF_SEQ_NUM, "RefSeqNum", FieldType::SeqNum),
            (tags::TEXT, "Text", FieldType::String),
            (tags::ENCRYPT_METHOD, "EncryptMethod", FieldType::Int),
            (tags::HEART_BT_INT, "HeartBtInt", FieldType::Int),
            (tags::TEST_REQ_ID, "TestReqID", FieldType::String),
            (tags::GAP_FILL_FLAG, "GapFillFlag", FieldType::Boolean),
            (tags::RESET_SEQ_NUM_FLAG, "ResetSeqNumFlag", FieldType::Boolean),
            (tags::REF_TAG_ID, "RefTagID", FieldType::Int),
            (tags::REF_MSG_TYPE, "RefMsgType", FieldType::String),
            (
                tags::SESSION_REJECT_REASON,
                "SessionRejectReason",
                FieldType::Int,
            ),
            (
                tags::BUSINESS_REJECT_REF_ID,
                "BusinessRejectRefID",
                FieldType::String,
            ),
            (
                tags::BUSINESS_REJECT_REASON,
                "BusinessRejectReason",
                FieldType::Int,
            ),
            (
                tags::NEXT_EXPECTED_MSG_SEQ_NUM,
                "NextExpectedMsgSeqNum",
                FieldType::SeqNum,
            ),
            (
                tags::DEFAULT_APPL_VER_ID,
                "DefaultApplVerID",
                FieldType::String,
            ),
        ] {
            dict.add_field(FieldDef::new(tag, name, ftype));
        }

        dict.add_message(MessageDef::new(
            "A",
            "Logon",
            vec![tags::ENCRYPT_METHOD, tags::HEART_BT_INT],
            vec![
                tags::ENCRYPT_METHOD,
                tags::HEART_BT_INT,
                tags::RESET_SEQ_NUM_FLAG,
                tags::NEXT_EXPECTED_MSG_SEQ_NUM,
                tags::DEFAULT_APPL_VER_ID,
                tags::TEXT,
            ],
        ));
        dict.add_message(MessageDef::new(
            "0",
            "Heartbeat",
            vec![],
            vec![tags::TEST_REQ_ID],
        ));
        dict.add_message(MessageDef::new(
            "1",
            "TestRequest",
            vec![tags::TEST_REQ_ID],
            vec![tags::TEST_REQ_ID],
        ));
        dict.add_message(MessageDef::new(
            "2",
            "ResendRequest",
            vec![tags::BEGIN_SEQ_NO, tags::END_SEQ_NO],
            vec![tags::BEGIN_SEQ_NO, tags::END_SEQ_NO],
        ));
        dict.add_message(MessageDef::new(
            "3",
            "Reject",
            vec![tags::REF_SEQ_NUM],
            vec![
                tags::REF_SEQ_NUM,
                tags::REF_TAG_ID,
                tags::REF_MSG_TYPE,
                tags::SESSION_REJECT_REASON,
                tags::TEXT,
            ],
        ));
        dict.add_message(MessageDef::new(
            "4",
            "SequenceReset",
            vec![tags::NEW_SEQ_NO],
            vec![tags::NEW_SEQ_NO, tags::GAP_FILL_FLAG],
        ));
        dict.add_message(MessageDef::new(
            "5",
            "Logout",
            vec![],
            vec![tags::TEXT],
        ));
        dict.add_message(MessageDef::new(
            "j",
            "BusinessMessageReject",
            vec![tags::BUSINESS_REJECT_REASON],
            vec![
                tags::REF_SEQ_NUM,
                tags::REF_MSG_TYPE,
                tags::BUSINESS_REJECT_REF_ID,
                tags::BUSINESS_REJECT_REASON,
                tags::TEXT,
            ],
        ));

        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults_cover_admin_alphabet() {
        let dict = Dictionary::session_defaults(Version::Fix44);
        for mt in ["A", "0", "1", "2", "3", "4", "5", "j"] {
            assert!(dict.message(mt).is_some(), "missing definition for {mt}");
        }
        assert!(dict.message("D").is_none());
        assert!(dict.allow_unknown_message_types);
    }

    #[test]
    fn logon_requires_heartbeat_interval() {
        let dict = Dictionary::session_defaults(Version::Fix44);
        let logon = dict.message("A").unwrap();
        assert!(logon.required.contains(&tags::HEART_BT_INT));
        assert!(logon.allows(tags::RESET_SEQ_NUM_FLAG));
        assert!(!logon.allows(55));
    }

    #[test]
    fn unconstrained_body_allows_everything() {
        let def = MessageDef::new("D", "NewOrderSingle", vec![], vec![]);
        assert!(def.allows(55));
        assert!(def.allows(20_000));
    }

    #[test]
    fn field_types() {
        assert!(FieldType::SeqNum.is_integral());
        assert!(FieldType::NumInGroup.is_integral());
        assert!(!FieldType::String.is_integral());
    }
}
