//! Conversation listing.
//!
//! [`ConversationStore`] resolves the requesting user's memberships into
//! [`ConversationPreview`]s: the other participant's profile, a task label,
//! and the newest loaded message. The default order is newest-created
//! first, which is what the product has always shown even though it
//! ignores message activity; [`SortStrategy::LastActivityDesc`] orders by
//! the newest message instead.

use std::cmp::Reverse;
use std::sync::Arc;

use serde::Deserialize;

use chorechat_model::conversation::{ConversationPreview, DEFAULT_TASK_LABEL};
use chorechat_model::ids::{Timestamp, UserId};

use crate::error::QueryError;
use crate::provider::{ConversationRow, DataProvider};

/// How the conversation list is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortStrategy {
    /// Newest conversation first, by creation time. A conversation never
    /// moves in the list no matter how recently it was messaged.
    #[default]
    CreatedDesc,
    /// Most recently active first, by the newest loaded message's sent
    /// time; conversations without messages fall back to creation time.
    LastActivityDesc,
}

/// Read side of the conversation list.
pub struct ConversationStore<P> {
    provider: Arc<P>,
    sort: SortStrategy,
}

impl<P: DataProvider> ConversationStore<P> {
    /// Creates a store over `provider` using the given sort order.
    pub const fn new(provider: Arc<P>, sort: SortStrategy) -> Self {
        Self { provider, sort }
    }

    /// Returns the sort strategy this store was configured with.
    #[must_use]
    pub const fn sort_strategy(&self) -> SortStrategy {
        self.sort
    }

    /// Lists the user's conversations as previews, sorted per the
    /// configured strategy. A user with no memberships gets an empty list;
    /// that is a normal state, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the membership or conversation fetch
    /// fails. Errors pass through unmodified; nothing here retries.
    pub async fn list_conversations(
        &self,
        user: UserId,
    ) -> Result<Vec<ConversationPreview>, QueryError> {
        let ids = self.provider.memberships(user).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.provider.conversations(&ids).await?;
        let mut previews: Vec<ConversationPreview> =
            rows.into_iter().map(|row| preview_for(user, row)).collect();

        match self.sort {
            SortStrategy::CreatedDesc => {
                previews.sort_by_key(|p| Reverse(p.created_at));
            }
            SortStrategy::LastActivityDesc => {
                previews.sort_by_key(|p| Reverse(p.last_activity().unwrap_or(p.created_at)));
            }
        }
        tracing::debug!(%user, count = previews.len(), "conversation list loaded");
        Ok(previews)
    }
}

/// Projects one joined row into the preview the list renders.
fn preview_for(user: UserId, row: ConversationRow) -> ConversationPreview {
    let other_user = row.members.into_iter().find(|p| p.id != user);
    let last_message = row.messages.into_iter().max_by_key(|m| m.sent_at);
    ConversationPreview {
        id: row.conversation.id,
        created_at: row.conversation.created_at,
        other_user,
        task_title: row
            .task_title
            .unwrap_or_else(|| DEFAULT_TASK_LABEL.to_string()),
        last_message,
    }
}

/// Formats a message timestamp for display using a `strftime`-style
/// pattern (e.g. `"%H:%M"`).
#[must_use]
pub fn format_timestamp(ts: Timestamp, pattern: &str) -> String {
    chrono::DateTime::from_timestamp_millis(i64::try_from(ts.as_millis()).unwrap_or(i64::MAX))
        .map_or_else(String::new, |dt| dt.format(pattern).to_string())
}
