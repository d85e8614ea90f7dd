//! Conversation rows, membership, and list previews.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, TaskId, Timestamp, UserId};
use crate::message::Message;
use crate::profile::Profile;

/// Label shown for conversations not attached to a task.
pub const DEFAULT_TASK_LABEL: &str = "General Chat";

/// A persisted conversation row.
///
/// Created once, never mutated structurally. Membership is fixed at
/// creation (exactly two members); the "last message" shown in lists is a
/// derived projection, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// The marketplace task this conversation is about, if any.
    pub task_id: Option<TaskId>,
    /// When the conversation was created.
    pub created_at: Timestamp,
}

/// Join row linking a user to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMember {
    /// The conversation.
    pub conversation_id: ConversationId,
    /// The member.
    pub user_id: UserId,
}

/// One item of the conversation list: a conversation enriched with the
/// other participant, a task label, and the most recent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPreview {
    /// The conversation id.
    pub id: ConversationId,
    /// When the conversation was created (drives the default list order).
    pub created_at: Timestamp,
    /// The participant who is not the requesting user.
    ///
    /// `None` only if the membership rows are inconsistent; the view shows
    /// an "unknown user" placeholder in that case rather than failing.
    pub other_user: Option<Profile>,
    /// Task title, or [`DEFAULT_TASK_LABEL`] for task-less conversations.
    pub task_title: String,
    /// The maximum-by-sent-time message among those loaded, if any.
    pub last_message: Option<Message>,
}

impl ConversationPreview {
    /// Sent time of the newest loaded message, if the conversation has one.
    ///
    /// This is what the last-activity sort strategy orders by.
    #[must_use]
    pub fn last_activity(&self) -> Option<Timestamp> {
        self.last_message.as_ref().map(|m| m.sent_at)
    }
}
