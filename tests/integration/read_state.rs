//! Integration tests for read-state updates.
//!
//! Mark-read flips the other participant's unread rows, never the
//! reader's own, is idempotent, and stays scoped to one conversation.

use std::sync::Arc;

use chorechat::chat::messages::MessageStore;
use chorechat::provider::DataProvider;
use chorechat::provider::memory::MemoryProvider;
use chorechat_model::ids::{ConversationId, UserId};
use chorechat_model::profile::Profile;

async fn connected_pair() -> (Arc<MemoryProvider>, UserId, UserId, ConversationId) {
    let provider = Arc::new(MemoryProvider::new());
    let alice = UserId::new();
    let bob = UserId::new();
    provider.upsert_profile(Profile::new(alice, "Alice")).await;
    provider.upsert_profile(Profile::new(bob, "Bob")).await;
    let conversation = provider
        .create_conversation(alice, bob, None)
        .await
        .unwrap();
    (provider, alice, bob, conversation.id)
}

#[tokio::test]
async fn reader_marks_only_the_other_side() {
    let (provider, alice, bob, conversation) = connected_pair().await;
    let store = MessageStore::new(provider);

    store.send_message(conversation, alice, "mine 1").await.unwrap();
    store.send_message(conversation, bob, "theirs 1").await.unwrap();
    store.send_message(conversation, bob, "theirs 2").await.unwrap();

    let changed = store.mark_read(conversation, alice).await.unwrap();
    assert_eq!(changed, 2);

    let history = store.get_messages(conversation).await.unwrap();
    for record in &history {
        if record.message.sender_id == alice {
            assert!(!record.message.read, "own message must stay unread");
        } else {
            assert!(record.message.read);
        }
    }
}

#[tokio::test]
async fn marking_twice_changes_nothing_the_second_time() {
    let (provider, alice, bob, conversation) = connected_pair().await;
    let store = MessageStore::new(provider);

    store.send_message(conversation, bob, "hello?").await.unwrap();

    assert_eq!(store.mark_read(conversation, alice).await.unwrap(), 1);
    assert_eq!(store.mark_read(conversation, alice).await.unwrap(), 0);
    assert_eq!(store.mark_read(conversation, alice).await.unwrap(), 0);
}

#[tokio::test]
async fn mark_read_is_scoped_to_one_conversation() {
    let (provider, alice, bob, first) = connected_pair().await;
    let second = provider
        .create_conversation(bob, alice, None)
        .await
        .unwrap();
    let store = MessageStore::new(provider);

    store.send_message(first, bob, "in first").await.unwrap();
    store.send_message(second.id, bob, "in second").await.unwrap();

    assert_eq!(store.mark_read(first, alice).await.unwrap(), 1);

    let untouched = store.get_messages(second.id).await.unwrap();
    assert!(!untouched[0].message.read);
}

#[tokio::test]
async fn both_sides_can_mark_their_own_view() {
    let (provider, alice, bob, conversation) = connected_pair().await;
    let store = MessageStore::new(provider);

    store.send_message(conversation, alice, "from alice").await.unwrap();
    store.send_message(conversation, bob, "from bob").await.unwrap();

    assert_eq!(store.mark_read(conversation, alice).await.unwrap(), 1);
    assert_eq!(store.mark_read(conversation, bob).await.unwrap(), 1);

    let history = store.get_messages(conversation).await.unwrap();
    assert!(history.iter().all(|r| r.message.read));
}

#[tokio::test]
async fn messages_arriving_after_mark_read_are_unread() {
    let (provider, alice, bob, conversation) = connected_pair().await;
    let store = MessageStore::new(provider);

    store.send_message(conversation, bob, "early").await.unwrap();
    store.mark_read(conversation, alice).await.unwrap();
    store.send_message(conversation, bob, "late").await.unwrap();

    let history = store.get_messages(conversation).await.unwrap();
    let late = history.iter().find(|r| r.message.body == "late").unwrap();
    assert!(!late.message.read);
    assert_eq!(store.mark_read(conversation, alice).await.unwrap(), 1);
}
