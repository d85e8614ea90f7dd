//! In-memory implementation of the provider traits.
//!
//! Backs the chat subsystem with plain tables behind async locks and a
//! per-conversation subscriber registry for realtime fan-out. Used by the
//! test suite and local development in place of the hosted backend; the
//! tables mirror the backend schema (`profiles`, `tasks`, `conversations`,
//! `conversation_members`, `messages`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use chorechat_model::conversation::{Conversation, ConversationMember};
use chorechat_model::ids::{ConversationId, MessageId, TaskId, Timestamp, UserId};
use chorechat_model::message::{Message, MessageRecord};
use chorechat_model::profile::Profile;

use crate::error::{QueryError, SubscriptionError};

use super::{ConversationRow, DataProvider, MessageFeed, RealtimeProvider};

/// Default capacity of each feed's delivery channel.
const DEFAULT_FEED_CAPACITY: usize = 256;

/// Display name used when a sender's profile row is missing.
const UNKNOWN_SENDER: &str = "Unknown";

/// Per-conversation registry of live feed senders.
///
/// Guarded by a synchronous lock so feeds can deregister from `Drop`.
/// Critical sections only touch the map — no awaiting while held.
struct SubscriberRegistry {
    inner: parking_lot::RwLock<HashMap<ConversationId, HashMap<Uuid, mpsc::Sender<serde_json::Value>>>>,
}

impl SubscriberRegistry {
    fn new() -> Self {
        Self {
            inner: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    fn register(&self, conversation: ConversationId, capacity: usize) -> (Uuid, mpsc::Receiver<serde_json::Value>) {
        let id = Uuid::now_v7();
        let (tx, rx) = mpsc::channel(capacity);
        self.inner
            .write()
            .entry(conversation)
            .or_default()
            .insert(id, tx);
        (id, rx)
    }

    fn deregister(&self, conversation: ConversationId, id: Uuid) {
        let mut inner = self.inner.write();
        if let Some(feeds) = inner.get_mut(&conversation) {
            feeds.remove(&id);
            if feeds.is_empty() {
                inner.remove(&conversation);
            }
        }
    }

    /// Delivers an insert event to every feed on the conversation.
    ///
    /// Best-effort: a feed whose channel is full misses the event (the
    /// consumer is expected to refetch history on reselect).
    fn fan_out(&self, conversation: ConversationId, row: &serde_json::Value) {
        let inner = self.inner.read();
        if let Some(feeds) = inner.get(&conversation) {
            for tx in feeds.values() {
                if tx.try_send(row.clone()).is_err() {
                    tracing::warn!(%conversation, "realtime feed lagging, event dropped");
                }
            }
        }
    }

    fn count(&self, conversation: ConversationId) -> usize {
        self.inner
            .read()
            .get(&conversation)
            .map_or(0, HashMap::len)
    }

    /// Drops every sender on the conversation, ending the feeds as a
    /// dropped connection would.
    fn sever(&self, conversation: ConversationId) {
        self.inner.write().remove(&conversation);
    }
}

/// A feed handed out by [`MemoryProvider::subscribe`].
///
/// Deregisters itself on drop, so no event is delivered after the feed is
/// released.
pub struct MemoryFeed {
    conversation: ConversationId,
    id: Uuid,
    rx: mpsc::Receiver<serde_json::Value>,
    registry: Arc<SubscriberRegistry>,
}

impl MessageFeed for MemoryFeed {
    async fn next_event(&mut self) -> Option<serde_json::Value> {
        self.rx.recv().await
    }
}

impl Drop for MemoryFeed {
    fn drop(&mut self) {
        self.registry.deregister(self.conversation, self.id);
    }
}

/// In-memory provider implementing [`DataProvider`] and
/// [`RealtimeProvider`].
pub struct MemoryProvider {
    profiles: RwLock<HashMap<UserId, Profile>>,
    tasks: RwLock<HashMap<TaskId, String>>,
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    members: RwLock<Vec<ConversationMember>>,
    messages: RwLock<Vec<Message>>,
    registry: Arc<SubscriberRegistry>,
    feed_capacity: usize,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Creates an empty provider with the default feed capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_feed_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Creates an empty provider with a custom feed channel capacity.
    #[must_use]
    pub fn with_feed_capacity(feed_capacity: usize) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            tasks: RwLock::new(HashMap::new()),
            conversations: RwLock::new(HashMap::new()),
            members: RwLock::new(Vec::new()),
            messages: RwLock::new(Vec::new()),
            registry: Arc::new(SubscriberRegistry::new()),
            feed_capacity,
        }
    }

    /// Inserts or replaces a profile row.
    pub async fn upsert_profile(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.id, profile);
    }

    /// Inserts a task row (id and display title).
    pub async fn insert_task(&self, task: TaskId, title: impl Into<String>) {
        self.tasks.write().await.insert(task, title.into());
    }

    /// Number of message rows stored for a conversation.
    pub async fn message_count(&self, conversation: ConversationId) -> usize {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation)
            .count()
    }

    /// Number of live feeds currently registered on a conversation.
    #[must_use]
    pub fn feed_count(&self, conversation: ConversationId) -> usize {
        self.registry.count(conversation)
    }

    /// Simulates a dropped realtime connection: every feed on the
    /// conversation ends (its `next_event` returns `None`).
    pub fn sever_feeds(&self, conversation: ConversationId) {
        self.registry.sever(conversation);
    }

    async fn record_for(&self, message: Message) -> MessageRecord {
        let profiles = self.profiles.read().await;
        let sender = profiles.get(&message.sender_id);
        MessageRecord {
            sender_name: sender.map_or_else(|| UNKNOWN_SENDER.to_string(), |p| p.name.clone()),
            sender_avatar_url: sender.and_then(|p| p.avatar_url.clone()),
            message,
        }
    }
}

impl DataProvider for MemoryProvider {
    async fn memberships(&self, user: UserId) -> Result<Vec<ConversationId>, QueryError> {
        Ok(self
            .members
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user)
            .map(|m| m.conversation_id)
            .collect())
    }

    async fn conversations(
        &self,
        ids: &[ConversationId],
    ) -> Result<Vec<ConversationRow>, QueryError> {
        let conversations = self.conversations.read().await;
        let members = self.members.read().await;
        let profiles = self.profiles.read().await;
        let tasks = self.tasks.read().await;
        let messages = self.messages.read().await;

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(conversation) = conversations.get(id) else {
                continue;
            };
            let member_profiles = members
                .iter()
                .filter(|m| m.conversation_id == *id)
                .filter_map(|m| profiles.get(&m.user_id).cloned())
                .collect();
            let task_title = conversation
                .task_id
                .and_then(|task| tasks.get(&task).cloned());
            let loaded = messages
                .iter()
                .filter(|m| m.conversation_id == *id)
                .cloned()
                .collect();
            rows.push(ConversationRow {
                conversation: conversation.clone(),
                members: member_profiles,
                task_title,
                messages: loaded,
            });
        }
        Ok(rows)
    }

    async fn messages(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<MessageRecord>, QueryError> {
        let mut rows: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation)
            .cloned()
            .collect();
        // Stable sort: equal sent_at values keep insertion order.
        rows.sort_by_key(|m| m.sent_at);

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.record_for(row).await);
        }
        Ok(records)
    }

    async fn insert_message(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: &str,
    ) -> Result<MessageRecord, QueryError> {
        if !self.conversations.read().await.contains_key(&conversation) {
            return Err(QueryError::NotFound(format!(
                "conversation {conversation}"
            )));
        }

        let message = Message {
            id: MessageId::new(),
            conversation_id: conversation,
            sender_id: sender,
            body: body.to_string(),
            sent_at: Timestamp::now(),
            read: false,
        };
        self.messages.write().await.push(message.clone());

        let record = self.record_for(message).await;
        match serde_json::to_value(&record) {
            Ok(row) => self.registry.fan_out(conversation, &row),
            Err(e) => tracing::warn!(error = %e, "failed to encode insert event, fan-out skipped"),
        }
        Ok(record)
    }

    async fn mark_read(
        &self,
        conversation: ConversationId,
        reader: UserId,
    ) -> Result<u64, QueryError> {
        let mut messages = self.messages.write().await;
        let mut changed = 0u64;
        for message in messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation && m.sender_id != reader && !m.read)
        {
            message.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn create_conversation(
        &self,
        user: UserId,
        other: UserId,
        task: Option<TaskId>,
    ) -> Result<Conversation, QueryError> {
        if user == other {
            return Err(QueryError::Constraint(
                "a conversation needs two distinct members".to_string(),
            ));
        }
        {
            let profiles = self.profiles.read().await;
            for id in [user, other] {
                if !profiles.contains_key(&id) {
                    return Err(QueryError::NotFound(format!("profile {id}")));
                }
            }
        }

        let conversation = Conversation {
            id: ConversationId::new(),
            task_id: task,
            created_at: Timestamp::now(),
        };
        self.conversations
            .write()
            .await
            .insert(conversation.id, conversation.clone());
        let mut members = self.members.write().await;
        members.push(ConversationMember {
            conversation_id: conversation.id,
            user_id: user,
        });
        members.push(ConversationMember {
            conversation_id: conversation.id,
            user_id: other,
        });
        drop(members);

        tracing::debug!(conversation = %conversation.id, "conversation created");
        Ok(conversation)
    }
}

impl RealtimeProvider for MemoryProvider {
    type Feed = MemoryFeed;

    async fn subscribe(
        &self,
        conversation: ConversationId,
    ) -> Result<MemoryFeed, SubscriptionError> {
        let (id, rx) = self.registry.register(conversation, self.feed_capacity);
        Ok(MemoryFeed {
            conversation,
            id,
            rx,
            registry: Arc::clone(&self.registry),
        })
    }
}
