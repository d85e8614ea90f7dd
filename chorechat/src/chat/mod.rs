//! Chat orchestration layer.
//!
//! [`ChatController`] owns the view-facing state machine: the conversation
//! list, the selected conversation's transcript, and the live feed. It
//! coordinates the three things that happen on selection (mark read, fetch
//! history, subscribe) and serializes their results through one internal
//! channel so the transcript is only ever touched from `next_event`.
//!
//! Responses are tagged with the selection epoch at the time they were
//! started; a response from a superseded selection is discarded rather
//! than applied, so switching conversations quickly can never interleave
//! two transcripts.

pub mod conversations;
pub mod messages;
pub mod subscription;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;

use chorechat_model::conversation::{Conversation, ConversationPreview};
use chorechat_model::ids::{ConversationId, MessageId, TaskId, UserId};
use chorechat_model::message::MessageRecord;
use chorechat_model::profile::Profile;

use crate::config::ChatConfig;
use crate::error::{ChatError, SubscriptionError};
use crate::provider::{DataProvider, RealtimeProvider};

use conversations::ConversationStore;
use messages::MessageStore;
use subscription::{LiveFeedHandle, spawn_supervised};

/// What the message pane is currently showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewState {
    /// Nothing selected; the pane shows a placeholder.
    #[default]
    NoConversationSelected,
    /// A conversation is selected and its history fetch is in flight.
    /// Live arrivals are buffered until the fetch resolves.
    LoadingHistory,
    /// History is loaded and live arrivals append directly.
    Ready,
    /// The history fetch failed or timed out; the transcript is empty
    /// until the conversation is reselected.
    HistoryFailed,
}

/// When a sent message appears in the sender's own transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SendMode {
    /// The message appears when the realtime feed echoes it back. The
    /// sender sees exactly what every other participant sees, at the cost
    /// of a round trip of latency.
    #[default]
    Echo,
    /// The persisted row is appended immediately on send; the feed echo
    /// is then deduplicated by message id.
    Optimistic,
}

/// Events the controller surfaces to the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// The conversation list was (re)loaded.
    ConversationsLoaded {
        /// Number of conversations in the list.
        count: usize,
    },
    /// The conversation list could not be loaded.
    ConversationListFailed {
        /// Human-readable failure description.
        reason: String,
    },
    /// The selected conversation's history finished loading; the
    /// transcript now holds history plus any arrivals buffered during the
    /// fetch.
    HistoryLoaded {
        /// The conversation whose history loaded.
        conversation: ConversationId,
        /// Transcript length after merging buffered arrivals.
        count: usize,
    },
    /// The history fetch failed or timed out.
    HistoryFailed {
        /// The conversation whose history failed.
        conversation: ConversationId,
        /// Human-readable failure description.
        reason: String,
    },
    /// A history response arrived for a selection that is no longer
    /// current and was dropped without touching the transcript.
    HistoryDiscarded {
        /// The conversation the stale response belonged to.
        conversation: ConversationId,
    },
    /// A message was appended to the transcript (live arrival or
    /// optimistic send).
    MessageAppended {
        /// The appended record.
        message: MessageRecord,
    },
    /// The other participant's messages were marked read.
    ReadStateApplied {
        /// The conversation that was marked read.
        conversation: ConversationId,
        /// Number of rows that changed (zero if all were already read).
        changed: u64,
    },
    /// The mark-read update failed. Non-fatal: the transcript still
    /// loads, the unread state just stays stale until the next selection.
    ReadMarkFailed {
        /// The conversation whose mark-read failed.
        conversation: ConversationId,
        /// Human-readable failure description.
        reason: String,
    },
    /// The realtime feed gave up after exhausting reconnect attempts.
    /// The transcript stays usable but no longer updates live.
    SubscriptionLost {
        /// The conversation whose feed was lost.
        conversation: ConversationId,
        /// Human-readable failure description.
        reason: String,
    },
}

/// Results funneled back from the tasks a selection spawns.
enum Internal {
    HistoryLoaded {
        epoch: u64,
        conversation: ConversationId,
        result: Result<Vec<MessageRecord>, ChatError>,
    },
    ReadMarked {
        epoch: u64,
        conversation: ConversationId,
        result: Result<u64, ChatError>,
    },
    Live {
        epoch: u64,
        conversation: ConversationId,
        item: Result<MessageRecord, SubscriptionError>,
    },
}

/// Orchestrates the conversation list, transcript, and live feed for one
/// signed-in user.
///
/// The session identity is injected at construction; the controller never
/// consults ambient authentication state.
pub struct ChatController<P> {
    provider: Arc<P>,
    user: Profile,
    conversations: ConversationStore<P>,
    store: MessageStore<P>,
    config: ChatConfig,

    state: ViewState,
    selected: Option<ConversationId>,
    /// Bumped on every selection change; responses carrying an older
    /// epoch are stale.
    epoch: u64,
    transcript: Vec<MessageRecord>,
    seen: HashSet<MessageId>,
    buffered: Vec<MessageRecord>,
    previews: Vec<ConversationPreview>,
    live: Option<LiveFeedHandle>,

    internal_tx: mpsc::Sender<Internal>,
    internal_rx: mpsc::Receiver<Internal>,
}

impl<P> ChatController<P>
where
    P: DataProvider + RealtimeProvider + 'static,
{
    /// Creates a controller for `user` over `provider`.
    pub fn new(provider: Arc<P>, user: Profile, config: ChatConfig) -> Self {
        let (internal_tx, internal_rx) = mpsc::channel(config.event_buffer);
        Self {
            conversations: ConversationStore::new(Arc::clone(&provider), config.sort),
            store: MessageStore::new(Arc::clone(&provider)),
            provider,
            user,
            config,
            state: ViewState::default(),
            selected: None,
            epoch: 0,
            transcript: Vec::new(),
            seen: HashSet::new(),
            buffered: Vec::new(),
            previews: Vec::new(),
            live: None,
            internal_tx,
            internal_rx,
        }
    }

    /// The signed-in user this controller was built for.
    #[must_use]
    pub const fn user(&self) -> &Profile {
        &self.user
    }

    /// Current message-pane state.
    #[must_use]
    pub const fn view_state(&self) -> ViewState {
        self.state
    }

    /// The selected conversation, if any.
    #[must_use]
    pub const fn selected_conversation(&self) -> Option<ConversationId> {
        self.selected
    }

    /// The selected conversation's transcript, ascending by sent time.
    #[must_use]
    pub fn transcript(&self) -> &[MessageRecord] {
        &self.transcript
    }

    /// The loaded conversation list, in configured sort order.
    #[must_use]
    pub fn conversation_previews(&self) -> &[ConversationPreview] {
        &self.previews
    }

    /// Loads (or reloads) the conversation list.
    ///
    /// A user with no conversations gets an empty list and a normal
    /// `ConversationsLoaded { count: 0 }`; a fetch failure leaves the
    /// previous list in place.
    pub async fn load_conversations(&mut self) -> ChatEvent {
        match self.conversations.list_conversations(self.user.id).await {
            Ok(previews) => {
                let count = previews.len();
                self.previews = previews;
                ChatEvent::ConversationsLoaded { count }
            }
            Err(e) => {
                tracing::warn!(error = %e, "conversation list load failed");
                ChatEvent::ConversationListFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Creates a conversation with `other` and reloads the list.
    ///
    /// # Errors
    ///
    /// Passes the provider's error through; notably
    /// [`QueryError::Constraint`](crate::error::QueryError::Constraint)
    /// for a self-conversation.
    pub async fn start_conversation(
        &mut self,
        other: UserId,
        task: Option<TaskId>,
    ) -> Result<Conversation, ChatError> {
        let conversation = self
            .provider
            .create_conversation(self.user.id, other, task)
            .await?;
        let _ = self.load_conversations().await;
        Ok(conversation)
    }

    /// Selects a conversation: closes the previous live feed, then starts
    /// the mark-read update, the history fetch, and a supervised
    /// subscription for the new one.
    ///
    /// Returns once the old feed is fully closed; the three started
    /// operations report back through [`next_event`](Self::next_event).
    pub async fn select_conversation(&mut self, conversation: ConversationId) {
        self.close_live().await;

        self.epoch += 1;
        let epoch = self.epoch;
        self.selected = Some(conversation);
        self.state = ViewState::LoadingHistory;
        self.transcript.clear();
        self.seen.clear();
        self.buffered.clear();
        tracing::debug!(%conversation, epoch, "conversation selected");

        // Mark-read runs concurrently with the history fetch; neither
        // blocks the other.
        let store = self.store.clone();
        let tx = self.internal_tx.clone();
        let reader = self.user.id;
        tokio::spawn(async move {
            let result = store.mark_read(conversation, reader).await;
            let _ = tx
                .send(Internal::ReadMarked {
                    epoch,
                    conversation,
                    result,
                })
                .await;
        });

        let store = self.store.clone();
        let tx = self.internal_tx.clone();
        let timeout = self.config.history_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, store.get_messages(conversation)).await
            {
                Ok(result) => result,
                Err(_) => Err(ChatError::HistoryTimeout { conversation }),
            };
            let _ = tx
                .send(Internal::HistoryLoaded {
                    epoch,
                    conversation,
                    result,
                })
                .await;
        });

        let (handle, mut stream) = spawn_supervised(
            Arc::clone(&self.provider),
            conversation,
            self.config.backoff,
            self.config.feed_buffer,
        );
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            while let Some(item) = stream.recv().await {
                if tx
                    .send(Internal::Live {
                        epoch,
                        conversation,
                        item,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        });
        self.live = Some(handle);
    }

    /// Clears the selection and closes the live feed.
    pub async fn deselect(&mut self) {
        self.close_live().await;
        self.epoch += 1;
        self.selected = None;
        self.state = ViewState::NoConversationSelected;
        self.transcript.clear();
        self.seen.clear();
        self.buffered.clear();
    }

    /// Sends a message to the selected conversation.
    ///
    /// In [`SendMode::Echo`] the message reaches the transcript via the
    /// realtime feed like any other arrival. In [`SendMode::Optimistic`]
    /// the persisted row is appended immediately and the later echo is
    /// deduplicated.
    ///
    /// # Errors
    ///
    /// [`ChatError::SendRejected`] if nothing is selected or the body is
    /// blank, [`ChatError::Validation`] for an otherwise invalid body, or
    /// the provider's error if the insert fails. A failed send changes no
    /// local state.
    pub async fn send_message(&mut self, body: &str) -> Result<(), ChatError> {
        let Some(conversation) = self.selected else {
            return Err(ChatError::SendRejected("no conversation selected"));
        };
        if body.trim().is_empty() {
            return Err(ChatError::SendRejected("empty message"));
        }
        let record = self.store.send_message(conversation, self.user.id, body).await?;

        if self.config.send_mode == SendMode::Optimistic
            && self.state == ViewState::Ready
            && self.seen.insert(record.id())
        {
            self.update_preview(&record);
            self.transcript.push(record);
        }
        Ok(())
    }

    /// Waits for the next view-facing event.
    ///
    /// Stale responses from superseded selections are consumed here; most
    /// are dropped silently, a stale history response surfaces as
    /// [`ChatEvent::HistoryDiscarded`] so the view can log it.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        while let Some(internal) = self.internal_rx.recv().await {
            if let Some(event) = self.apply(internal) {
                return Some(event);
            }
        }
        None
    }

    fn apply(&mut self, internal: Internal) -> Option<ChatEvent> {
        match internal {
            Internal::HistoryLoaded {
                epoch,
                conversation,
                result,
            } => {
                if epoch != self.epoch {
                    tracing::debug!(%conversation, epoch, "stale history response dropped");
                    return Some(ChatEvent::HistoryDiscarded { conversation });
                }
                match result {
                    Ok(records) => {
                        self.transcript = records;
                        self.seen = self.transcript.iter().map(MessageRecord::id).collect();
                        // Arrivals buffered during the fetch go after
                        // history; anything the fetch already saw is
                        // dropped by id.
                        for record in std::mem::take(&mut self.buffered) {
                            if self.seen.insert(record.id()) {
                                self.update_preview(&record);
                                self.transcript.push(record);
                            }
                        }
                        self.state = ViewState::Ready;
                        Some(ChatEvent::HistoryLoaded {
                            conversation,
                            count: self.transcript.len(),
                        })
                    }
                    Err(e) => {
                        tracing::warn!(%conversation, error = %e, "history load failed");
                        self.state = ViewState::HistoryFailed;
                        self.buffered.clear();
                        Some(ChatEvent::HistoryFailed {
                            conversation,
                            reason: e.to_string(),
                        })
                    }
                }
            }
            Internal::ReadMarked {
                epoch,
                conversation,
                result,
            } => {
                if epoch != self.epoch {
                    return None;
                }
                match result {
                    Ok(changed) => {
                        if changed > 0 {
                            self.mark_preview_read(conversation);
                        }
                        Some(ChatEvent::ReadStateApplied {
                            conversation,
                            changed,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(%conversation, error = %e, "mark-read failed");
                        Some(ChatEvent::ReadMarkFailed {
                            conversation,
                            reason: e.to_string(),
                        })
                    }
                }
            }
            Internal::Live {
                epoch,
                conversation,
                item,
            } => {
                if epoch != self.epoch {
                    return None;
                }
                match item {
                    Ok(record) => match self.state {
                        ViewState::LoadingHistory => {
                            self.buffered.push(record);
                            None
                        }
                        ViewState::Ready => {
                            if self.seen.insert(record.id()) {
                                self.update_preview(&record);
                                self.transcript.push(record.clone());
                                Some(ChatEvent::MessageAppended { message: record })
                            } else {
                                None
                            }
                        }
                        ViewState::NoConversationSelected | ViewState::HistoryFailed => None,
                    },
                    Err(e) => Some(ChatEvent::SubscriptionLost {
                        conversation,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    async fn close_live(&mut self) {
        if let Some(handle) = self.live.take() {
            handle.close().await;
        }
    }

    /// Refreshes the list preview for a newly appended message.
    fn update_preview(&mut self, record: &MessageRecord) {
        if let Some(preview) = self
            .previews
            .iter_mut()
            .find(|p| p.id == record.conversation_id())
        {
            let newer = preview
                .last_activity()
                .is_none_or(|ts| record.sent_at() >= ts);
            if newer {
                preview.last_message = Some(record.message.clone());
            }
        }
    }

    /// Reflects a successful mark-read in the list preview.
    fn mark_preview_read(&mut self, conversation: ConversationId) {
        if let Some(preview) = self.previews.iter_mut().find(|p| p.id == conversation)
            && let Some(last) = &mut preview.last_message
            && last.sender_id != self.user.id
        {
            last.read = true;
        }
    }
}
