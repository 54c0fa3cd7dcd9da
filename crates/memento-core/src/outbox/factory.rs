//! Offline note creation.

use std::collections::HashSet;

use chrono::Utc;
use memento_api::{Note, NoteDraft, User};
use tracing::info;
use uuid::Uuid;

use super::model::PendingNote;
use crate::Result;
use crate::store::LocalStore;

/// Queue a draft as a pending note and return its note-shaped view.
///
/// The draft is expected to be validated by the caller. The pending note
/// and its CREATE operation are committed together; the returned note has
/// `id = tempId`, `user_id = user.id` and `is_offline` set.
///
/// # Errors
///
/// Returns an error if the outbox cannot be written. Nothing is queued in
/// that case.
pub async fn create_offline(store: &LocalStore, draft: &NoteDraft, user: &User) -> Result<Note> {
    let cached_ids: HashSet<String> = store.get_cache().await.into_iter().map(|n| n.id).collect();
    let created_at = Utc::now();

    let pending = store
        .update_outbox(|outbox| {
            let temp_id = fresh_temp_id(|id| outbox.contains(id) || cached_ids.contains(id));
            let pending = PendingNote::new(temp_id, draft.clone(), created_at);
            outbox.enqueue(pending.clone());
            pending
        })
        .await?;

    info!("Saved note {} offline", pending.temp_id);
    Ok(pending.to_note(&user.id))
}

fn fresh_temp_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !taken(&id) {
            return id;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "me@example.com".to_string(),
            full_name: None,
            profile_picture: None,
            gender: None,
            birth_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_offline_queues_note() {
        let store = LocalStore::in_memory().await.unwrap();
        let draft = NoteDraft::new("A", "a").with_color("#fff");

        let note = create_offline(&store, &draft, &user()).await.unwrap();
        assert!(note.is_offline);
        assert_eq!(note.user_id, "u1");
        assert_eq!(note.title, "A");
        assert_eq!(note.color.as_deref(), Some("#fff"));

        let outbox = store.get_outbox().await;
        assert_eq!(outbox.pending().len(), 1);
        assert_eq!(outbox.queue().len(), 1);
        assert_eq!(outbox.pending()[0].temp_id, note.id);
        assert_eq!(outbox.queue()[0].id, note.id);
        assert_eq!(outbox.queue()[0].data.payload, draft);
    }

    #[tokio::test]
    async fn test_temp_ids_are_unique() {
        let store = LocalStore::in_memory().await.unwrap();
        let draft = NoteDraft::new("A", "a");

        let first = create_offline(&store, &draft, &user()).await.unwrap();
        let second = create_offline(&store, &draft, &user()).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.get_queue().await.len(), 2);
    }

    #[test]
    fn test_fresh_temp_id_skips_taken() {
        let calls = std::cell::Cell::new(0);
        let id = fresh_temp_id(|_| {
            calls.set(calls.get() + 1);
            calls.get() == 1
        });
        assert_eq!(calls.get(), 2);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
