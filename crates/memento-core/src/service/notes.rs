//! High-level note operations for UI code.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use memento_api::{Note, NoteClient, NoteDraft, NoteUpdate};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::connectivity::Connectivity;
use crate::note::validate_draft;
use crate::outbox::{PENDING_USER_ID, create_offline};
use crate::remote::RemoteNotes;
use crate::session::{self, Session};
use crate::store::LocalStore;
use crate::sync::{LoadOutcome, ReadMerger, Reconciler, SyncReport};
use crate::{Error, Result};

/// Result of [`NoteService::create`].
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// The created note. Offline notes carry their temporary id.
    pub note: Note,
    /// The note was queued locally and will sync later.
    pub saved_offline: bool,
}

/// Offline-first note service.
///
/// Wires the connectivity oracle, local store, remote client, reconciler
/// and read merger together.
pub struct NoteService {
    store: Arc<LocalStore>,
    connectivity: Arc<Connectivity>,
    remote: RemoteNotes,
    reconciler: Arc<Reconciler>,
    merger: ReadMerger,
}

impl NoteService {
    /// Open the service with the given configuration.
    ///
    /// Creates the database directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub async fn open(config: &EngineConfig, connectivity: Arc<Connectivity>) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let store = LocalStore::new(config.database_path_str()?).await?;
        let client = config.note_client()?;

        info!("Opened note store at {}", config.database_path.display());
        Ok(Self::with_parts(
            Arc::new(store),
            connectivity,
            client,
            config.cache_max_age,
        ))
    }

    /// Assemble the service from already-built parts.
    #[must_use]
    pub fn with_parts(
        store: Arc<LocalStore>,
        connectivity: Arc<Connectivity>,
        client: NoteClient,
        cache_max_age: Option<Duration>,
    ) -> Self {
        let remote = RemoteNotes::new(client, store.clone());
        let reconciler = Arc::new(Reconciler::new(
            connectivity.clone(),
            store.clone(),
            remote.clone(),
        ));
        let merger = ReadMerger::new(
            connectivity.clone(),
            store.clone(),
            remote.clone(),
            reconciler.clone(),
        )
        .with_cache_max_age(cache_max_age);

        Self {
            store,
            connectivity,
            remote,
            reconciler,
            merger,
        }
    }

    /// The local store.
    #[must_use]
    pub const fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// The connectivity oracle.
    #[must_use]
    pub const fn connectivity(&self) -> &Arc<Connectivity> {
        &self.connectivity
    }

    // ---- session ----

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the session
    /// cannot be stored.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self.remote.sign_in(email, password).await?;
        session::establish(&self.store, response).await
    }

    /// Register, then persist the new session.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails or the session cannot be stored.
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let response = self.remote.sign_up(email, password, full_name).await?;
        session::establish(&self.store, response).await
    }

    /// The stored session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.store.load_session().await
    }

    /// Sign out, discarding the session and every local note table.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub async fn sign_out(&self) -> Result<()> {
        session::teardown(&self.store).await
    }

    // ---- reads ----

    /// Load the merged note list. See [`ReadMerger::load`].
    pub async fn load(&self, session: &Session, force_refresh: bool) -> LoadOutcome {
        self.merger.load(session, force_refresh).await
    }

    /// Fetch one note.
    ///
    /// Pending notes are answered locally. Otherwise the server is asked
    /// when online, with the cached copy as fallback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the note is unknown, or
    /// [`Error::AuthExpired`] if the server rejected the session.
    pub async fn get(&self, session: &Session, id: &str) -> Result<Note> {
        if let Some(pending) = self.store.get_outbox().await.find(id) {
            return Ok(pending.to_note(PENDING_USER_ID));
        }

        if self.connectivity.is_connected() {
            match self.remote.get(session, id).await {
                Ok(note) => return Ok(note),
                Err(Error::Api(e)) if e.status() == Some(404) => {
                    return Err(Error::NotFound(id.to_string()));
                }
                Err(Error::AuthExpired) => return Err(Error::AuthExpired),
                Err(e) => warn!("Failed to fetch note {id}, checking cache: {e}"),
            }
        }

        self.store
            .get_cache()
            .await
            .into_iter()
            .find(|note| note.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Number of notes waiting to sync.
    pub async fn pending_count(&self) -> usize {
        self.store.get_outbox().await.len()
    }

    // ---- writes ----

    /// Run a reconciliation pass. See [`Reconciler::sync`].
    pub async fn sync(&self, session: &Session) -> SyncReport {
        self.reconciler.sync(session).await
    }

    /// Create a note.
    ///
    /// Online, the note is created on the server. Offline, or if the server
    /// call fails for any reason other than an expired session, the note is
    /// queued locally instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid draft,
    /// [`Error::AuthExpired`] if the server rejected the session, or a
    /// storage error if the note could not be queued.
    pub async fn create(&self, session: &Session, draft: &NoteDraft) -> Result<CreateOutcome> {
        validate_draft(draft, Utc::now()).map_err(Error::Validation)?;

        if self.connectivity.is_connected() {
            match self.remote.create(session, draft, None).await {
                Ok(note) => {
                    if let Err(e) = self.remote.refresh_cache(session).await {
                        warn!("Failed to refresh notes after create: {e}");
                    }
                    return Ok(CreateOutcome {
                        note,
                        saved_offline: false,
                    });
                }
                Err(Error::AuthExpired) => return Err(Error::AuthExpired),
                Err(e) => warn!("Online create failed, saving offline: {e}"),
            }
        }

        let note = create_offline(&self.store, draft, &session.user).await?;
        Ok(CreateOutcome {
            note,
            saved_offline: true,
        })
    }

    /// Update a note.
    ///
    /// A pending note is amended locally, together with its queued create.
    /// If a sync pass is submitting the note, this waits for the pass; a
    /// note it synced is no longer pending and is updated remotely under
    /// its temporary id, which the server does not know. A synced note
    /// needs connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Offline`] for a synced note while offline,
    /// [`Error::NotFound`] if the server does not know the id, or an
    /// error if the server call or the local write fails.
    pub async fn update(&self, session: &Session, id: &str, update: &NoteUpdate) -> Result<Note> {
        {
            let _pass = self.reconciler.exclusive().await;
            if self.store.get_outbox().await.contains(id) {
                if let Some(pending) = self
                    .store
                    .update_outbox(|outbox| outbox.amend(id, update))
                    .await?
                {
                    debug!("Amended pending note {id}");
                    return Ok(pending.to_note(PENDING_USER_ID));
                }
            }
        }

        if !self.connectivity.is_connected() {
            return Err(Error::Offline(
                "Cannot update notes while offline".to_string(),
            ));
        }

        let note = self
            .remote
            .update(session, id, update)
            .await
            .map_err(|e| not_found(e, id))?;
        if let Err(e) = self.remote.refresh_cache(session).await {
            warn!("Failed to refresh notes after update: {e}");
        }
        Ok(note)
    }

    /// Delete a note.
    ///
    /// A pending note is discarded locally along with its queued create,
    /// after any running sync pass. A synced note needs connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Offline`] for a synced note while offline,
    /// [`Error::NotFound`] if the server does not know the id, or an
    /// error if the server call or the local write fails.
    pub async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        {
            let _pass = self.reconciler.exclusive().await;
            if self.store.get_outbox().await.contains(id)
                && self
                    .store
                    .update_outbox(|outbox| outbox.remove(id))
                    .await?
                    .is_some()
            {
                info!("Discarded pending note {id}");
                return Ok(());
            }
        }

        if !self.connectivity.is_connected() {
            return Err(Error::Offline(
                "Cannot delete synced notes while offline".to_string(),
            ));
        }

        self.remote
            .remove(session, id)
            .await
            .map_err(|e| not_found(e, id))?;
        if let Err(e) = self.remote.refresh_cache(session).await {
            warn!("Failed to refresh notes after delete: {e}");
        }
        Ok(())
    }

    /// Delete several notes in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error; notes before it stay deleted.
    pub async fn delete_many<S: AsRef<str>>(&self, session: &Session, ids: &[S]) -> Result<()> {
        for id in ids {
            self.delete(session, id.as_ref()).await?;
        }
        Ok(())
    }

    /// Run a sync pass with the stored session whenever the oracle reports
    /// an online state.
    ///
    /// The task ends once the oracle is dropped, or at the first report
    /// after the service is dropped.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        let mut changes = self.connectivity.watch();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                if !changes.borrow_and_update().is_online() {
                    continue;
                }
                let Some(service) = service.upgrade() else {
                    break;
                };
                let Some(session) = service.current_session().await else {
                    debug!("Back online but signed out, nothing to sync");
                    continue;
                };

                let report = service.sync(&session).await;
                if !report.is_empty() {
                    info!("Auto-sync: {}", report.summary());
                }
            }
            debug!("Auto-sync stopped");
        })
    }
}

/// Maps a remote 404 to [`Error::NotFound`].
fn not_found(error: Error, id: &str) -> Error {
    match error {
        Error::Api(e) if e.status() == Some(404) => Error::NotFound(id.to_string()),
        other => other,
    }
}
