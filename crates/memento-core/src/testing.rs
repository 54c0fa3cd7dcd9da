//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use memento_api::{Note, NoteClient, User};

use crate::connectivity::{Connectivity, NetworkState};
use crate::remote::RemoteNotes;
use crate::session::Session;
use crate::store::LocalStore;

pub fn user() -> User {
    User {
        id: "u1".to_string(),
        email: "me@example.com".to_string(),
        full_name: Some("Me".to_string()),
        profile_picture: None,
        gender: None,
        birth_date: None,
    }
}

pub fn session() -> Session {
    Session::new("tok", user())
}

pub fn note(id: &str, created_at: DateTime<Utc>) -> Note {
    Note {
        id: id.to_string(),
        user_id: "u1".to_string(),
        title: format!("Note {id}"),
        content: "body".to_string(),
        color: None,
        mood: None,
        mood_emoji: None,
        selected_icon: None,
        is_locked: false,
        is_time_capsule: false,
        unlock_date: None,
        created_at,
        is_offline: false,
    }
}

/// Store with a saved session, an oracle in the given state and a remote
/// pointed at `base_url`.
pub async fn fixture(
    base_url: &str,
    online: bool,
) -> (Arc<LocalStore>, Arc<Connectivity>, RemoteNotes) {
    let store = Arc::new(LocalStore::in_memory().await.unwrap());
    store.save_session(&session()).await.unwrap();
    let state = if online {
        NetworkState::online()
    } else {
        NetworkState::offline()
    };
    let connectivity = Arc::new(Connectivity::new(state));
    let remote = RemoteNotes::new(NoteClient::new(base_url).unwrap(), store.clone());
    (store, connectivity, remote)
}
