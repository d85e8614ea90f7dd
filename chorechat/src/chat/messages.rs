//! Message history, sends, and read-state updates.
//!
//! [`MessageStore`] is a thin layer over the provider. Its one piece of
//! logic is body validation: an invalid body is rejected here and never
//! reaches the provider. Everything else passes through unchanged,
//! including failures.

use std::sync::Arc;

use chorechat_model::ids::{ConversationId, UserId};
use chorechat_model::message::{MessageRecord, validate_body};

use crate::error::ChatError;
use crate::provider::DataProvider;

/// Store for a single conversation's messages.
pub struct MessageStore<P> {
    provider: Arc<P>,
}

impl<P> Clone for MessageStore<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: DataProvider> MessageStore<P> {
    /// Creates a store over `provider`.
    pub const fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Fetches a conversation's full history, ascending by sent time.
    ///
    /// # Errors
    ///
    /// Passes [`QueryError`](crate::error::QueryError) through from the
    /// provider.
    pub async fn get_messages(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<MessageRecord>, ChatError> {
        Ok(self.provider.messages(conversation).await?)
    }

    /// Validates and persists one message.
    ///
    /// Validation runs before the provider is touched; on a validation
    /// failure no insert is attempted. The returned record is the
    /// persisted row, which is also what the realtime feed delivers.
    /// There is no idempotency key, so retrying a failed send may insert
    /// a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Validation`] for an empty or oversized body,
    /// or the provider's error if the insert fails.
    pub async fn send_message(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: &str,
    ) -> Result<MessageRecord, ChatError> {
        validate_body(body)?;
        let record = self
            .provider
            .insert_message(conversation, sender, body)
            .await?;
        tracing::debug!(
            conversation = %conversation,
            message = %record.id(),
            "message sent"
        );
        Ok(record)
    }

    /// Marks every message from the other participant as read. Returns
    /// how many rows changed; zero means everything was already read.
    ///
    /// # Errors
    ///
    /// Passes the provider's error through if the update fails.
    pub async fn mark_read(
        &self,
        conversation: ConversationId,
        reader: UserId,
    ) -> Result<u64, ChatError> {
        Ok(self.provider.mark_read(conversation, reader).await?)
    }
}
