//! Integration tests for the conversation list.
//!
//! Verifies that memberships resolve into complete previews (other
//! participant, task label, newest message) and that both sort strategies
//! order a realistic multi-conversation inbox correctly.

use std::sync::Arc;
use std::time::Duration;

use chorechat::chat::conversations::{ConversationStore, SortStrategy, format_timestamp};
use chorechat::provider::DataProvider;
use chorechat::provider::memory::MemoryProvider;
use chorechat_model::conversation::DEFAULT_TASK_LABEL;
use chorechat_model::ids::{TaskId, Timestamp, UserId};
use chorechat_model::profile::Profile;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(provider: &MemoryProvider, name: &str) -> UserId {
    let id = UserId::new();
    provider.upsert_profile(Profile::new(id, name)).await;
    id
}

#[tokio::test]
async fn inbox_with_mixed_task_and_general_conversations() {
    let provider = Arc::new(MemoryProvider::new());
    let alice = seed_user(&provider, "Alice").await;
    let bob = seed_user(&provider, "Bob").await;
    let carol = seed_user(&provider, "Carol").await;

    let task = TaskId::new();
    provider.insert_task(task, "Paint the fence").await;

    let with_task = provider
        .create_conversation(alice, bob, Some(task))
        .await
        .unwrap();
    let general = provider
        .create_conversation(alice, carol, None)
        .await
        .unwrap();

    let store = ConversationStore::new(provider, SortStrategy::CreatedDesc);
    let previews = store.list_conversations(alice).await.unwrap();
    assert_eq!(previews.len(), 2);

    let tasked = previews.iter().find(|p| p.id == with_task.id).unwrap();
    assert_eq!(tasked.task_title, "Paint the fence");
    assert_eq!(tasked.other_user.as_ref().unwrap().name, "Bob");

    let untasked = previews.iter().find(|p| p.id == general.id).unwrap();
    assert_eq!(untasked.task_title, DEFAULT_TASK_LABEL);
    assert_eq!(untasked.other_user.as_ref().unwrap().name, "Carol");
}

#[tokio::test]
async fn each_participant_sees_the_other_as_counterpart() {
    let provider = Arc::new(MemoryProvider::new());
    let alice = seed_user(&provider, "Alice").await;
    let bob = seed_user(&provider, "Bob").await;
    provider.create_conversation(alice, bob, None).await.unwrap();

    let store = ConversationStore::new(provider, SortStrategy::default());
    let alice_view = store.list_conversations(alice).await.unwrap();
    let bob_view = store.list_conversations(bob).await.unwrap();

    assert_eq!(alice_view[0].other_user.as_ref().unwrap().name, "Bob");
    assert_eq!(bob_view[0].other_user.as_ref().unwrap().name, "Alice");
}

#[tokio::test]
async fn preview_tracks_the_newest_message() {
    let provider = Arc::new(MemoryProvider::new());
    let alice = seed_user(&provider, "Alice").await;
    let bob = seed_user(&provider, "Bob").await;
    let conversation = provider
        .create_conversation(alice, bob, None)
        .await
        .unwrap();

    for body in ["first", "second", "third"] {
        provider
            .insert_message(conversation.id, bob, body)
            .await
            .unwrap();
    }

    let store = ConversationStore::new(provider, SortStrategy::default());
    let previews = store.list_conversations(alice).await.unwrap();
    assert_eq!(previews[0].last_message.as_ref().unwrap().body, "third");
}

#[tokio::test]
async fn default_sort_is_stable_under_activity() {
    let provider = Arc::new(MemoryProvider::new());
    let alice = seed_user(&provider, "Alice").await;
    let bob = seed_user(&provider, "Bob").await;
    let carol = seed_user(&provider, "Carol").await;

    let oldest = provider.create_conversation(alice, bob, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let middle = provider
        .create_conversation(alice, carol, None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let newest = provider.create_conversation(bob, alice, None).await.unwrap();

    // A burst of messages in the oldest conversation.
    for _ in 0..3 {
        provider
            .insert_message(oldest.id, bob, "ping")
            .await
            .unwrap();
    }

    let store = ConversationStore::new(provider, SortStrategy::CreatedDesc);
    let previews = store.list_conversations(alice).await.unwrap();
    let order: Vec<_> = previews.iter().map(|p| p.id).collect();
    assert_eq!(order, vec![newest.id, middle.id, oldest.id]);
}

#[tokio::test]
async fn activity_sort_promotes_recently_messaged() {
    let provider = Arc::new(MemoryProvider::new());
    let alice = seed_user(&provider, "Alice").await;
    let bob = seed_user(&provider, "Bob").await;
    let carol = seed_user(&provider, "Carol").await;

    let oldest = provider.create_conversation(alice, bob, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let quiet = provider
        .create_conversation(alice, carol, None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;

    provider
        .insert_message(oldest.id, bob, "reviving an old thread")
        .await
        .unwrap();

    let store = ConversationStore::new(provider, SortStrategy::LastActivityDesc);
    let previews = store.list_conversations(alice).await.unwrap();
    // The messaged conversation leads; the quiet one falls back to its
    // creation time.
    assert_eq!(previews[0].id, oldest.id);
    assert_eq!(previews[1].id, quiet.id);
}

#[tokio::test]
async fn stranger_sees_an_empty_inbox() {
    let provider = Arc::new(MemoryProvider::new());
    let alice = seed_user(&provider, "Alice").await;
    let bob = seed_user(&provider, "Bob").await;
    provider.create_conversation(alice, bob, None).await.unwrap();

    let stranger = seed_user(&provider, "Mallory").await;
    let store = ConversationStore::new(provider, SortStrategy::default());
    let previews = store.list_conversations(stranger).await.unwrap();
    assert!(previews.is_empty());
}

#[test]
fn preview_timestamps_render_with_the_configured_pattern() {
    // 2024-03-01 12:30:45 UTC
    let ts = Timestamp::from_millis(1_709_296_245_000);
    assert_eq!(format_timestamp(ts, "%H:%M"), "12:30");
    assert_eq!(format_timestamp(ts, "%b %d"), "Mar 01");
}
