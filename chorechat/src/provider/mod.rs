//! Provider traits abstracting the external persistence/realtime backend.
//!
//! The chat subsystem never talks to the backend directly; it goes through
//! [`DataProvider`] for relational-style reads and writes and
//! [`RealtimeProvider`] for insert-event feeds. Production deployments
//! implement these against the hosted BaaS; [`memory::MemoryProvider`]
//! implements them in-process for tests and local development.

pub mod memory;

use chorechat_model::conversation::Conversation;
use chorechat_model::ids::{ConversationId, TaskId, UserId};
use chorechat_model::message::{Message, MessageRecord};
use chorechat_model::profile::Profile;

use crate::error::{QueryError, SubscriptionError};

/// A conversation row with everything the list view needs joined in:
/// member profiles, the optional task title, and the loaded messages the
/// preview is computed from.
///
/// This mirrors the nested select the hosted backend serves: one query,
/// denormalized result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    /// The conversation itself.
    pub conversation: Conversation,
    /// Profiles of the (two) members.
    pub members: Vec<Profile>,
    /// Title of the associated task, if the conversation has one.
    pub task_title: Option<String>,
    /// All messages loaded for this conversation.
    pub messages: Vec<Message>,
}

/// Relational-style operations on the chat tables.
///
/// Implementations surface failures as [`QueryError`] and never retry;
/// retry policy belongs to callers (and in this subsystem, nobody
/// retries queries).
pub trait DataProvider: Send + Sync {
    /// Returns the ids of all conversations the user is a member of.
    fn memberships(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<ConversationId>, QueryError>> + Send;

    /// Fetches conversation rows for the given ids, with members, task
    /// title, and messages joined in. Unknown ids are skipped.
    fn conversations(
        &self,
        ids: &[ConversationId],
    ) -> impl Future<Output = Result<Vec<ConversationRow>, QueryError>> + Send;

    /// Returns the conversation's messages with sender display metadata,
    /// ordered ascending by sent time; equal timestamps keep insertion
    /// order.
    fn messages(
        &self,
        conversation: ConversationId,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, QueryError>> + Send;

    /// Inserts one message row and fans an insert event out to all active
    /// realtime feeds on that conversation.
    ///
    /// The provider performs no body validation — that happens in the
    /// message store before this is ever called. There is no idempotency
    /// key: retrying a send inserts a second row.
    fn insert_message(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: &str,
    ) -> impl Future<Output = Result<MessageRecord, QueryError>> + Send;

    /// Flips `read` to true on every message in the conversation whose
    /// sender is not `reader` and which is still unread. Returns the
    /// number of rows changed. Idempotent; triggers no realtime fan-out.
    fn mark_read(
        &self,
        conversation: ConversationId,
        reader: UserId,
    ) -> impl Future<Output = Result<u64, QueryError>> + Send;

    /// Creates a conversation between two users with its two member rows.
    ///
    /// Rejects self-conversations with [`QueryError::Constraint`].
    fn create_conversation(
        &self,
        user: UserId,
        other: UserId,
        task: Option<TaskId>,
    ) -> impl Future<Output = Result<Conversation, QueryError>> + Send;
}

/// A live feed of insert events for one conversation.
///
/// Events arrive as JSON rows (the shape the backend's realtime channel
/// delivers) in insertion order for the lifetime of a single feed; no
/// ordering is guaranteed across reconnects. `next_event` returning
/// `None` means the channel was dropped. Dropping the feed guarantees no
/// further deliveries.
pub trait MessageFeed: Send {
    /// Waits for the next insert event, or `None` if the channel dropped.
    fn next_event(&mut self) -> impl Future<Output = Option<serde_json::Value>> + Send;
}

/// Subscribe-by-filter access to message insert events.
pub trait RealtimeProvider: Send + Sync {
    /// The feed type this provider hands out.
    type Feed: MessageFeed + 'static;

    /// Opens a feed of insert events scoped to one conversation.
    fn subscribe(
        &self,
        conversation: ConversationId,
    ) -> impl Future<Output = Result<Self::Feed, SubscriptionError>> + Send;
}
