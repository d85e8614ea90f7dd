//! Supervised realtime subscriptions.
//!
//! A raw [`RealtimeProvider`](crate::provider::RealtimeProvider) feed dies
//! silently when the channel drops. [`spawn_supervised`] wraps one in a
//! background task that decodes JSON rows into [`MessageRecord`]s,
//! resubscribes when the feed ends, and backs off exponentially when
//! subscribing itself fails. After `max_retries` consecutive failures the
//! supervisor reports [`SubscriptionError::RetriesExhausted`] and stops.
//!
//! Events are delivered in insertion order within one feed; no ordering is
//! guaranteed across a reconnect. Consumers that need a consistent view
//! after a gap should refetch history.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chorechat_model::ids::ConversationId;
use chorechat_model::message::MessageRecord;

use crate::error::SubscriptionError;
use crate::provider::{MessageFeed, RealtimeProvider};

/// Reconnect policy for the subscription supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry; doubles on each consecutive failure.
    pub initial: Duration,
    /// Consecutive subscribe failures tolerated before giving up.
    pub max_retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            max_retries: 5,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial.saturating_mul(2u32.saturating_pow(exp))
    }
}

/// Handle to a supervised subscription's background task.
///
/// [`close`](Self::close) aborts the task and waits for it to finish, so
/// once it returns no further event is delivered on the paired receiver.
/// Dropping the handle aborts the task without waiting.
pub struct LiveFeedHandle {
    task: Option<JoinHandle<()>>,
}

impl LiveFeedHandle {
    /// Stops the supervisor and waits until it has fully shut down.
    pub async fn close(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for LiveFeedHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Receiver half of a supervised subscription, usable as a
/// [`Stream`](futures_util::Stream).
///
/// Yields decoded records, or one final `Err` when the supervisor gives
/// up. The stream ends after the supervisor stops.
pub struct MessageStream {
    rx: mpsc::Receiver<Result<MessageRecord, SubscriptionError>>,
}

impl MessageStream {
    /// Waits for the next delivery.
    pub async fn recv(&mut self) -> Option<Result<MessageRecord, SubscriptionError>> {
        self.rx.recv().await
    }
}

impl Stream for MessageStream {
    type Item = Result<MessageRecord, SubscriptionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Starts a supervised subscription on one conversation.
///
/// The returned handle owns the background task; the stream yields decoded
/// live records. Rows that fail to decode are logged and skipped — one
/// malformed event must not kill the feed.
pub fn spawn_supervised<R>(
    provider: Arc<R>,
    conversation: ConversationId,
    backoff: BackoffConfig,
    capacity: usize,
) -> (LiveFeedHandle, MessageStream)
where
    R: RealtimeProvider + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(supervise(provider, conversation, backoff, tx));
    (LiveFeedHandle { task: Some(task) }, MessageStream { rx })
}

async fn supervise<R>(
    provider: Arc<R>,
    conversation: ConversationId,
    backoff: BackoffConfig,
    tx: mpsc::Sender<Result<MessageRecord, SubscriptionError>>,
) where
    R: RealtimeProvider,
{
    let mut attempts: u32 = 0;
    loop {
        match provider.subscribe(conversation).await {
            Ok(mut feed) => {
                attempts = 0;
                tracing::debug!(%conversation, "realtime feed established");
                while let Some(event) = feed.next_event().await {
                    let Some(record) = decode_row(conversation, event) else {
                        continue;
                    };
                    if tx.send(Ok(record)).await.is_err() {
                        // Consumer went away; nothing left to supervise.
                        return;
                    }
                }
                tracing::warn!(%conversation, "realtime feed ended, resubscribing");
            }
            Err(e) => {
                attempts += 1;
                if attempts > backoff.max_retries {
                    tracing::error!(
                        %conversation,
                        attempts,
                        error = %e,
                        "giving up on realtime feed"
                    );
                    let _ = tx
                        .send(Err(SubscriptionError::RetriesExhausted {
                            attempts,
                            last: e.to_string(),
                        }))
                        .await;
                    return;
                }
                let delay = backoff.delay_for(attempts);
                tracing::warn!(
                    %conversation,
                    attempt = attempts,
                    delay = ?delay,
                    error = %e,
                    "subscribe failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Decodes one realtime JSON row, skipping rows that don't parse or that
/// belong to a different conversation (a misdelivered event is a provider
/// bug, not a reason to crash the feed).
fn decode_row(conversation: ConversationId, event: serde_json::Value) -> Option<MessageRecord> {
    match serde_json::from_value::<MessageRecord>(event) {
        Ok(record) if record.conversation_id() == conversation => Some(record),
        Ok(record) => {
            tracing::warn!(
                expected = %conversation,
                got = %record.conversation_id(),
                "dropping event for wrong conversation"
            );
            None
        }
        Err(e) => {
            tracing::warn!(%conversation, error = %e, "dropping malformed realtime event");
            None
        }
    }
}
