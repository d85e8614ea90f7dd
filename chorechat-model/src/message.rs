//! Message rows and body validation for the `ChoreChat` data model.
//!
//! A [`Message`] is the persisted row; a [`MessageRecord`] is the
//! denormalized shape the persistence provider returns for rendering
//! (message plus sender display metadata). Realtime insert events carry
//! a `MessageRecord` serialized as a JSON row.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, MessageId, Timestamp, UserId};

/// Maximum allowed message body size in bytes (64 KiB).
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Error returned when a message body fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Message body is empty or whitespace-only.
    #[error("message body is empty")]
    Empty,
    /// Message body exceeds the maximum allowed size.
    #[error("message too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the body in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

/// Validates a message body for sending.
///
/// Rejects bodies that are empty after trimming whitespace, and bodies
/// larger than [`MAX_BODY_SIZE`]. Validation happens before the body ever
/// reaches the persistence provider.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] if the body is blank after trimming,
/// or [`ValidationError::TooLarge`] if it exceeds `MAX_BODY_SIZE`.
pub fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let size = body.len();
    if size > MAX_BODY_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_BODY_SIZE,
        });
    }
    Ok(())
}

/// A persisted message row.
///
/// Append-only: the only permitted mutation is flipping `read` from
/// `false` to `true`. Messages are never edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Who sent this message.
    pub sender_id: UserId,
    /// The message text.
    pub body: String,
    /// When the message was sent.
    pub sent_at: Timestamp,
    /// Whether a non-sender participant has marked this message read.
    pub read: bool,
}

/// A message joined with its sender's display metadata.
///
/// This is the shape `get_messages` returns and the shape realtime insert
/// events deliver, so the view layer never needs a second profile lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// The message row.
    #[serde(flatten)]
    pub message: Message,
    /// Sender display name at the time the row was read.
    pub sender_name: String,
    /// Sender avatar reference, if any.
    pub sender_avatar_url: Option<String>,
}

impl MessageRecord {
    /// Returns the message id.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.message.id
    }

    /// Returns the conversation this record belongs to.
    #[must_use]
    pub const fn conversation_id(&self) -> ConversationId {
        self.message.conversation_id
    }

    /// Returns when the message was sent.
    #[must_use]
    pub const fn sent_at(&self) -> Timestamp {
        self.message.sent_at
    }
}
