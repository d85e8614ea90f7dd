//! Property-based tests for the message data model.
//!
//! Uses proptest to verify:
//! 1. Sorting any set of messages by sent time is non-decreasing and is a
//!    permutation of the input.
//! 2. Body validation never accepts a blank body and never rejects a
//!    reasonable one.
//! 3. A `MessageRecord` survives the flat-JSON row shape the realtime
//!    channel delivers.

use proptest::prelude::*;
use uuid::Uuid;

use chorechat_model::ids::{ConversationId, MessageId, Timestamp, UserId};
use chorechat_model::message::{
    MAX_BODY_SIZE, Message, MessageRecord, ValidationError, validate_body,
};

// --- Strategies ---

fn arb_message_id() -> impl Strategy<Value = MessageId> {
    any::<u128>().prop_map(|n| MessageId::from_uuid(Uuid::from_u128(n)))
}

fn arb_user_id() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

fn arb_conversation_id() -> impl Strategy<Value = ConversationId> {
    any::<u128>().prop_map(|n| ConversationId::from_uuid(Uuid::from_u128(n)))
}

fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    any::<u64>().prop_map(Timestamp::from_millis)
}

fn arb_message() -> impl Strategy<Value = Message> {
    (
        arb_message_id(),
        arb_conversation_id(),
        arb_user_id(),
        "[^\x00]{1,256}",
        arb_timestamp(),
        any::<bool>(),
    )
        .prop_map(|(id, conversation_id, sender_id, body, sent_at, read)| Message {
            id,
            conversation_id,
            sender_id,
            body,
            sent_at,
            read,
        })
}

fn arb_record() -> impl Strategy<Value = MessageRecord> {
    (
        arb_message(),
        "[^\x00]{1,64}",
        prop::option::of("[ -~]{1,128}"),
    )
        .prop_map(|(message, sender_name, sender_avatar_url)| MessageRecord {
            message,
            sender_name,
            sender_avatar_url,
        })
}

// --- Properties ---

proptest! {
    #[test]
    fn sort_by_sent_time_is_non_decreasing(mut messages in prop::collection::vec(arb_message(), 0..50)) {
        let original_len = messages.len();
        messages.sort_by_key(|m| m.sent_at);

        prop_assert_eq!(messages.len(), original_len);
        for pair in messages.windows(2) {
            prop_assert!(pair[0].sent_at <= pair[1].sent_at);
        }
    }

    #[test]
    fn sort_is_a_permutation(messages in prop::collection::vec(arb_message(), 0..50)) {
        let mut sorted = messages.clone();
        sorted.sort_by_key(|m| m.sent_at);

        let mut original_ids: Vec<_> = messages.iter().map(|m| m.id).collect();
        let mut sorted_ids: Vec<_> = sorted.iter().map(|m| m.id).collect();
        original_ids.sort();
        sorted_ids.sort();
        prop_assert_eq!(original_ids, sorted_ids);
    }

    #[test]
    fn blank_bodies_are_always_rejected(body in "[ \t\n\r]{0,64}") {
        prop_assert_eq!(validate_body(&body), Err(ValidationError::Empty));
    }

    #[test]
    fn bodies_with_content_are_accepted(prefix in "[ \t]{0,8}", core in "[a-zA-Z0-9 ]{1,512}", ch in prop::char::range('a', 'z')) {
        // At least one guaranteed non-whitespace character.
        let body = format!("{prefix}{core}{ch}");
        prop_assert!(body.len() <= MAX_BODY_SIZE);
        prop_assert_eq!(validate_body(&body), Ok(()));
    }

    #[test]
    fn record_survives_the_flat_json_row(record in arb_record()) {
        let row = serde_json::to_value(&record).unwrap();
        // Flat row: message fields at top level, no nested object.
        prop_assert!(row.get("message").is_none());
        prop_assert!(row.get("body").is_some());

        let decoded: MessageRecord = serde_json::from_value(row).unwrap();
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn timestamp_order_matches_millis(a in any::<u64>(), b in any::<u64>()) {
        let (ta, tb) = (Timestamp::from_millis(a), Timestamp::from_millis(b));
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
    }
}
