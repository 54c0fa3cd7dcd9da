//! Read merger: the unified, newest-first note list.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use memento_api::Note;
use tracing::{debug, warn};

use super::reconciler::Reconciler;
use crate::connectivity::Connectivity;
use crate::outbox::{PENDING_USER_ID, PendingNote};
use crate::remote::RemoteNotes;
use crate::session::Session;
use crate::store::LocalStore;

/// Where a loaded list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Fresh server list plus pending notes.
    Remote,
    /// Cache younger than the configured maximum age plus pending notes.
    Cache,
    /// Offline: cache plus pending notes.
    Offline,
    /// Online, but the fetch failed: cache plus pending notes.
    Degraded,
}

/// Result of [`ReadMerger::load`].
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Notes, newest first.
    pub notes: Vec<Note>,
    /// Where the list came from.
    pub origin: LoadOrigin,
    /// The server rejected the session; local state has been cleared.
    pub session_expired: bool,
}

impl LoadOutcome {
    /// True if the list was served from local data because the network was
    /// unavailable or failed.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        matches!(self.origin, LoadOrigin::Offline | LoadOrigin::Degraded)
    }
}

/// Produces the note list shown to the user.
pub struct ReadMerger {
    connectivity: Arc<Connectivity>,
    store: Arc<LocalStore>,
    remote: RemoteNotes,
    reconciler: Arc<Reconciler>,
    cache_max_age: Option<Duration>,
}

impl ReadMerger {
    /// Create a merger.
    #[must_use]
    pub const fn new(
        connectivity: Arc<Connectivity>,
        store: Arc<LocalStore>,
        remote: RemoteNotes,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            connectivity,
            store,
            remote,
            reconciler,
            cache_max_age: None,
        }
    }

    /// Serve `load(false)` from a cache younger than `max_age` when nothing
    /// is waiting to sync.
    #[must_use]
    pub const fn with_cache_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.cache_max_age = max_age;
        self
    }

    /// Load the note list.
    ///
    /// Offline, returns cache and pending notes without touching the
    /// network. Online, runs a sync pass, fetches the server list, replaces
    /// the cache with it and merges in whatever is still pending. A pass
    /// that already refreshed the cache saves the second fetch. A failed
    /// fetch falls back to the offline result. Never fails.
    pub async fn load(&self, session: &Session, force_refresh: bool) -> LoadOutcome {
        if !self.connectivity.is_connected() {
            return self.local(LoadOrigin::Offline).await;
        }

        if !force_refresh && self.cache_is_warm().await {
            debug!("Serving notes from warm cache");
            return self.local(LoadOrigin::Cache).await;
        }

        let (report, refreshed) = self.reconciler.reconcile(session).await;
        if report.session_expired {
            let mut outcome = self.local(LoadOrigin::Degraded).await;
            outcome.session_expired = true;
            return outcome;
        }

        let fetched = match refreshed {
            Some(notes) => Ok(notes),
            None => self.remote.refresh_cache(session).await,
        };
        match fetched {
            Ok(notes) => {
                let pending = self.store.get_pending().await;
                LoadOutcome {
                    notes: merge_notes(notes, &pending),
                    origin: LoadOrigin::Remote,
                    session_expired: false,
                }
            }
            Err(e) => {
                warn!("Failed to fetch notes, showing local copy: {e}");
                let mut outcome = self.local(LoadOrigin::Degraded).await;
                outcome.session_expired = e.is_auth_expired();
                outcome
            }
        }
    }

    async fn local(&self, origin: LoadOrigin) -> LoadOutcome {
        let cache = self.store.get_cache().await;
        let pending = self.store.get_pending().await;
        LoadOutcome {
            notes: merge_notes(cache, &pending),
            origin,
            session_expired: false,
        }
    }

    async fn cache_is_warm(&self) -> bool {
        let Some(max_age) = self.cache_max_age else {
            return false;
        };
        let Some(updated_at) = self.store.cache_updated_at().await else {
            return false;
        };
        let fresh = (Utc::now() - updated_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed < max_age);

        fresh && self.store.get_queue().await.is_empty()
    }
}

/// Merge synced notes with projected pending notes, newest first.
///
/// The sort is stable: notes with equal `created_at` keep their input
/// order, synced notes before pending ones.
#[must_use]
pub fn merge_notes(mut notes: Vec<Note>, pending: &[PendingNote]) -> Vec<Note> {
    notes.extend(pending.iter().map(|p| p.to_note(PENDING_USER_ID)));
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connectivity::NetworkState;
    use crate::outbox::create_offline;
    use crate::testing::{fixture, note, session, user};
    use chrono::{DateTime, TimeZone};
    use httpmock::prelude::*;
    use memento_api::NoteDraft;
    use proptest::prelude::*;
    use serde_json::json;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn merger(
        store: Arc<LocalStore>,
        connectivity: Arc<Connectivity>,
        remote: RemoteNotes,
    ) -> ReadMerger {
        let reconciler = Arc::new(Reconciler::new(
            connectivity.clone(),
            store.clone(),
            remote.clone(),
        ));
        ReadMerger::new(connectivity, store, remote, reconciler)
    }

    #[test]
    fn test_merge_orders_newest_first() {
        let cache = vec![note("t1", at(1)), note("t3", at(3))];
        let pending = vec![PendingNote::new(
            "t2".to_string(),
            NoteDraft::new("A", "a"),
            at(2),
        )];

        let merged = merge_notes(cache, &pending);
        let ids: Vec<_> = merged.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
        assert_eq!(merged[1].user_id, "temp");
        assert!(merged[1].is_offline);
    }

    proptest! {
        #[test]
        fn prop_merge_is_sorted_and_complete(
            cached in prop::collection::vec(0i64..1000, 0..20),
            pending in prop::collection::vec(0i64..1000, 0..20),
        ) {
            let cache: Vec<Note> = cached
                .iter()
                .enumerate()
                .map(|(i, s)| note(&format!("c{i}"), at(*s)))
                .collect();
            let pending: Vec<PendingNote> = pending
                .iter()
                .enumerate()
                .map(|(i, s)| PendingNote::new(format!("p{i}"), NoteDraft::new("A", "a"), at(*s)))
                .collect();

            let merged = merge_notes(cache.clone(), &pending);
            prop_assert_eq!(merged.len(), cache.len() + pending.len());
            prop_assert!(merged.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        }
    }

    #[tokio::test]
    async fn test_offline_load_skips_network() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/notes");
                then.status(200).json_body(json!([]));
            })
            .await;
        let (store, connectivity, remote) = fixture(&server.base_url(), false).await;
        store.save_cache(&[note("n1", at(1))]).await.unwrap();
        let created = create_offline(&store, &NoteDraft::new("A", "a"), &user())
            .await
            .unwrap();

        let outcome = merger(store, connectivity, remote)
            .load(&session(), true)
            .await;

        assert_eq!(outcome.origin, LoadOrigin::Offline);
        assert_eq!(outcome.notes.len(), 2);
        assert_eq!(outcome.notes[0].id, created.id);
        list.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_online_load_replaces_cache() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/notes");
                then.status(200).json_body(json!([{
                    "id": "srv-1",
                    "userId": "u1",
                    "title": "Fresh",
                    "content": "x",
                    "createdAt": "2026-01-01T00:00:00Z"
                }]));
            })
            .await;
        let (store, connectivity, remote) = fixture(&server.base_url(), true).await;
        store.save_cache(&[note("stale", at(1))]).await.unwrap();

        let outcome = merger(store.clone(), connectivity, remote)
            .load(&session(), false)
            .await;

        assert_eq!(outcome.origin, LoadOrigin::Remote);
        assert_eq!(outcome.notes.len(), 1);
        assert_eq!(outcome.notes[0].id, "srv-1");
        assert_eq!(store.get_cache().await[0].id, "srv-1");
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_local() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/notes");
                then.status(502);
            })
            .await;
        let (store, connectivity, remote) = fixture(&server.base_url(), true).await;
        store.save_cache(&[note("n1", at(1))]).await.unwrap();

        let outcome = merger(store, connectivity, remote)
            .load(&session(), true)
            .await;

        assert_eq!(outcome.origin, LoadOrigin::Degraded);
        assert!(outcome.is_offline());
        assert!(!outcome.session_expired);
        assert_eq!(outcome.notes[0].id, "n1");
    }

    #[tokio::test]
    async fn test_expired_session_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/notes");
                then.status(401).json_body(json!({"error": "Unauthorized"}));
            })
            .await;
        let (store, connectivity, remote) = fixture(&server.base_url(), true).await;
        store.save_cache(&[note("n1", at(1))]).await.unwrap();

        let outcome = merger(store.clone(), connectivity, remote)
            .load(&session(), true)
            .await;

        assert!(outcome.session_expired);
        assert!(outcome.notes.is_empty());
        assert!(store.load_session().await.is_none());
    }

    #[tokio::test]
    async fn test_warm_cache_skips_network() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/notes");
                then.status(200).json_body(json!([]));
            })
            .await;
        let (store, connectivity, remote) = fixture(&server.base_url(), true).await;
        store.save_cache(&[note("n1", at(1))]).await.unwrap();

        let merger = merger(store, connectivity.clone(), remote)
            .with_cache_max_age(Some(Duration::from_secs(300)));

        let outcome = merger.load(&session(), false).await;
        assert_eq!(outcome.origin, LoadOrigin::Cache);
        list.assert_hits_async(0).await;

        let outcome = merger.load(&session(), true).await;
        assert_eq!(outcome.origin, LoadOrigin::Remote);
        list.assert_hits_async(1).await;

        connectivity.report(NetworkState::offline());
        let outcome = merger.load(&session(), false).await;
        assert_eq!(outcome.origin, LoadOrigin::Offline);
    }

    #[tokio::test]
    async fn test_load_after_sync_fetches_once() {
        let server = MockServer::start_async().await;
        let (store, connectivity, remote) = fixture(&server.base_url(), true).await;
        create_offline(&store, &NoteDraft::new("A", "a"), &user())
            .await
            .unwrap();

        server
            .mock_async(|when, then| {
                when.method(POST).path("/notes");
                then.status(201).json_body(json!({
                    "id": "srv-1",
                    "userId": "u1",
                    "title": "A",
                    "content": "a",
                    "createdAt": "2026-01-01T00:00:00Z"
                }));
            })
            .await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/notes");
                then.status(200).json_body(json!([{
                    "id": "srv-1",
                    "userId": "u1",
                    "title": "A",
                    "content": "a",
                    "createdAt": "2026-01-01T00:00:00Z"
                }]));
            })
            .await;

        let outcome = merger(store.clone(), connectivity, remote)
            .load(&session(), true)
            .await;

        assert_eq!(outcome.origin, LoadOrigin::Remote);
        assert_eq!(outcome.notes.len(), 1);
        assert_eq!(outcome.notes[0].id, "srv-1");
        assert!(store.get_outbox().await.is_empty());
        list.assert_hits_async(1).await;
    }
}
