//! Authenticated remote note access with session teardown on 401.

use std::sync::Arc;

use memento_api::{AuthResponse, Note, NoteClient, NoteDraft, NoteUpdate};
use tracing::{error, warn};

use crate::session::{self, Session};
use crate::store::LocalStore;
use crate::{Error, Result};

/// Remote note client bound to the local store.
///
/// Every call carries the session's bearer token. When the server answers
/// `401`, all local auth and note state is cleared and the call fails with
/// [`Error::AuthExpired`].
#[derive(Clone)]
pub struct RemoteNotes {
    client: NoteClient,
    store: Arc<LocalStore>,
}

impl RemoteNotes {
    /// Bind a client to a store.
    #[must_use]
    pub const fn new(client: NoteClient, store: Arc<LocalStore>) -> Self {
        Self { client, store }
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn client(&self) -> &NoteClient {
        &self.client
    }

    /// List the signed-in user's notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_mine(&self, session: &Session) -> Result<Vec<Note>> {
        let result = self.client.list_mine(&session.token).await;
        self.check(result).await
    }

    /// Fetch one note.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, session: &Session, id: &str) -> Result<Note> {
        let result = self.client.get(&session.token, id).await;
        self.check(result).await
    }

    /// Create a note, optionally with an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create(
        &self,
        session: &Session,
        draft: &NoteDraft,
        idempotency_key: Option<&str>,
    ) -> Result<Note> {
        let result = self
            .client
            .create(&session.token, draft, idempotency_key)
            .await;
        self.check(result).await
    }

    /// Partially update a note.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update(&self, session: &Session, id: &str, update: &NoteUpdate) -> Result<Note> {
        let result = self.client.update(&session.token, id, update).await;
        self.check(result).await
    }

    /// Delete a note.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn remove(&self, session: &Session, id: &str) -> Result<()> {
        let result = self.client.remove(&session.token, id).await;
        self.check(result).await
    }

    /// Fetch the note list and replace the cache with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails. A failed cache write is only logged.
    pub async fn refresh_cache(&self, session: &Session) -> Result<Vec<Note>> {
        let notes = self.list_mine(session).await?;
        if let Err(e) = self.store.save_cache(&notes).await {
            warn!("Failed to update note cache: {e}");
        }
        Ok(notes)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        Ok(self.client.sign_in_with_email(email, password).await?)
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created or the request fails.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse> {
        Ok(self
            .client
            .sign_up_with_email(email, password, full_name)
            .await?)
    }

    async fn check<T>(&self, result: memento_api::Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                if let Err(clear) = session::teardown(&self.store).await {
                    error!("Failed to clear local state after 401: {clear}");
                }
                Err(Error::AuthExpired)
            }
            Err(e) => Err(e.into()),
        }
    }
}
