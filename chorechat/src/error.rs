//! Error taxonomy for the chat subsystem.
//!
//! Three provider-facing categories — query failures, subscription
//! failures, and body validation — plus [`ChatError`] which the
//! controller surfaces to the view layer. Stores pass provider errors
//! through unmodified; nothing in this subsystem retries a failed query.

use chorechat_model::ids::ConversationId;
pub use chorechat_model::message::ValidationError;

/// A persistence call failed — network trouble or a constraint violation.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The provider could not be reached or refused the connection.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// A constraint was violated (e.g. self-conversation).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// The realtime channel failed to establish or was dropped.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The channel could not be established.
    #[error("failed to establish realtime channel: {0}")]
    ChannelFailed(String),

    /// The supervisor gave up after repeated reconnect failures.
    #[error("realtime channel lost after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// How many subscribe attempts were made.
        attempts: u32,
        /// Description of the last failure.
        last: String,
    },
}

/// Errors the controller surfaces to the view layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Message body validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A persistence call failed.
    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    /// The realtime channel failed.
    #[error("subscription failed: {0}")]
    Subscription(#[from] SubscriptionError),

    /// A send was rejected before reaching the store.
    #[error("send rejected: {0}")]
    SendRejected(&'static str),

    /// The history fetch did not complete within the configured timeout.
    #[error("history load timed out for conversation {conversation}")]
    HistoryTimeout {
        /// The conversation whose history was being loaded.
        conversation: ConversationId,
    },
}
