//! Signed-in session state.
//!
//! A [`Session`] is passed explicitly to every operation that talks to the
//! server. It is created by [`establish`] after sign-in and destroyed by
//! [`teardown`] on sign-out or when the server rejects the token.

use memento_api::{AuthResponse, User};
use tracing::info;

use crate::Result;
use crate::store::LocalStore;

/// Bearer token and user of the signed-in account.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token sent with every note request.
    pub token: String,
    /// The signed-in user.
    pub user: User,
}

impl Session {
    /// Creates a session value.
    #[must_use]
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user.id)
            .finish()
    }
}

/// Persist a fresh session from a sign-in or sign-up response.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn establish(store: &LocalStore, response: AuthResponse) -> Result<Session> {
    let session = Session::new(response.token, response.user);
    store.save_session(&session).await?;
    info!("Signed in as {}", session.user.email);
    Ok(session)
}

/// End the session: token, user, cache, pending notes and queue are cleared.
///
/// # Errors
///
/// Returns an error if the store cannot be cleared.
pub async fn teardown(store: &LocalStore) -> Result<()> {
    info!("Tearing down session and local note state");
    store.clear_all().await
}
