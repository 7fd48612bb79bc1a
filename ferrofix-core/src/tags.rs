/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Named FIX tag numbers used by the session layer.

/// BeginSeqNo (ResendRequest range start).
pub const BEGIN_SEQ_NO: u32 = 7;
/// BeginString, identifies the FIX protocol version.
pub const BEGIN_STRING: u32 = 8;
/// BodyLength, byte count of the message body.
pub const BODY_LENGTH: u32 = 9;
/// CheckSum, mod-256 sum of the preceding bytes.
pub const CHECK_SUM: u32 = 10;
/// EndSeqNo (ResendRequest range end, 0 = unbounded).
pub const END_SEQ_NO: u32 = 16;
/// MsgSeqNum, per-direction message counter.
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType.
pub const MSG_TYPE: u32 = 35;
/// NewSeqNo (SequenceReset target).
pub const NEW_SEQ_NO: u32 = 36;
/// PossDupFlag, Y on replayed messages.
pub const POSS_DUP_FLAG: u32 = 43;
/// RefSeqNum, sequence number a Reject refers to.
pub const REF_SEQ_NUM: u32 = 45;
/// SenderCompID.
pub const SENDER_COMP_ID: u32 = 49;
/// SenderSubID.
pub const SENDER_SUB_ID: u32 = 50;
/// SendingTime, UTC timestamp of transmission.
pub const SENDING_TIME: u32 = 52;
/// TargetCompID.
pub const TARGET_COMP_ID: u32 = 56;
/// TargetSubID.
pub const TARGET_SUB_ID: u32 = 57;
/// Text, free-form explanation.
pub const TEXT: u32 = 58;
/// Signature.
pub const SIGNATURE: u32 = 89;
/// SignatureLength.
pub const SIGNATURE_LENGTH: u32 = 93;
/// PossResend.
pub const POSS_RESEND: u32 = 97;
/// EncryptMethod, 0 = none.
pub const ENCRYPT_METHOD: u32 = 98;
/// HeartBtInt, heartbeat interval in seconds.
pub const HEART_BT_INT: u32 = 108;
/// TestReqID, challenge echoed by the answering Heartbeat.
pub const TEST_REQ_ID: u32 = 112;
/// OnBehalfOfCompID.
pub const ON_BEHALF_OF_COMP_ID: u32 = 115;
/// OnBehalfOfSubID.
pub const ON_BEHALF_OF_SUB_ID: u32 = 116;
/// OrigSendingTime, SendingTime of the original transmission on replays.
pub const ORIG_SENDING_TIME: u32 = 122;
/// GapFillFlag, Y when a SequenceReset only skips admin messages.
pub const GAP_FILL_FLAG: u32 = 123;
/// DeliverToCompID.
pub const DELIVER_TO_COMP_ID: u32 = 128;
/// DeliverToSubID.
pub const DELIVER_TO_SUB_ID: u32 = 129;
/// ResetSeqNumFlag, Y on a Logon that realigns both counters to 1.
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// SenderLocationID.
pub const SENDER_LOCATION_ID: u32 = 142;
/// TargetLocationID.
pub const TARGET_LOCATION_ID: u32 = 143;
/// OnBehalfOfLocationID.
pub const ON_BEHALF_OF_LOCATION_ID: u32 = 144;
/// DeliverToLocationID.
pub const DELIVER_TO_LOCATION_ID: u32 = 145;
/// RefTagID, tag a Reject attributes the failure to.
pub const REF_TAG_ID: u32 = 371;
/// RefMsgType, MsgType a reject refers to.
pub const REF_MSG_TYPE: u32 = 372;
/// SessionRejectReason.
pub const SESSION_REJECT_REASON: u32 = 373;
/// BusinessRejectRefID.
pub const BUSINESS_REJECT_REF_ID: u32 = 379;
/// BusinessRejectReason.
pub const BUSINESS_REJECT_REASON: u32 = 380;
/// LastMsgSeqNumProcessed.
pub const LAST_MSG_SEQ_NUM_PROCESSED: u32 = 369;
/// NextExpectedMsgSeqNum.
pub const NEXT_EXPECTED_MSG_SEQ_NUM: u32 = 789;
/// ApplVerID (FIX 5.x).
pub const APPL_VER_ID: u32 = 1128;
/// DefaultApplVerID, negotiated on a FIXT Logon.
pub const DEFAULT_APPL_VER_ID: u32 = 1137;
