//! User profile shape supplied by the identity provider.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Public profile of a user as the identity provider exposes it.
///
/// Identity (`id`) is immutable; `name` and `avatar_url` are mutable
/// profile fields the chat subsystem only ever reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar image reference, if the user has one.
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Convenience constructor for a profile without an avatar.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar_url: None,
        }
    }
}
