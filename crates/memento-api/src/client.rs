//! Authenticated HTTP client for the note API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{AuthResponse, SignInRequest, SignUpRequest};
use crate::error::{Error, ErrorResponse, Result};
use crate::note::{Note, NoteDraft, NoteUpdate};

/// Header carrying the client-generated identity of a queued create.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Client for the JSON note API.
///
/// Every note call takes the bearer token explicitly; the client holds no
/// session state of its own.
#[derive(Debug, Clone)]
pub struct NoteClient {
    base_url: Url,
    http_client: Client,
}

impl NoteClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot carry path segments.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "API URL cannot be a base: {base_url}"
            )));
        }

        Ok(Self {
            base_url,
            http_client: Client::new(),
        })
    }

    /// Replaces the underlying HTTP client (timeouts, proxies, TLS).
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Applies a transport-level timeout to every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Returns the API root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lists the notes owned by the token's user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on 401, or an error if the request fails.
    pub async fn list_mine(&self, token: &str) -> Result<Vec<Note>> {
        let url = self.endpoint(&["notes"])?;
        debug!("GET {url}");
        let response = send(self.http_client.get(url), token).await?;
        parse(response, "Failed to fetch notes").await
    }

    /// Fetches a single note.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on 401, or an error if the request fails.
    pub async fn get(&self, token: &str, id: &str) -> Result<Note> {
        let url = self.endpoint(&["notes", id])?;
        debug!("GET {url}");
        let response = send(self.http_client.get(url), token).await?;
        parse(response, "Failed to get note").await
    }

    /// Creates a note. The server assigns `id`, `userId` and `createdAt`.
    ///
    /// When `idempotency_key` is set it is sent as [`IDEMPOTENCY_HEADER`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on 401, or an error if the request fails.
    pub async fn create(
        &self,
        token: &str,
        draft: &NoteDraft,
        idempotency_key: Option<&str>,
    ) -> Result<Note> {
        let url = self.endpoint(&["notes"])?;
        debug!("POST {url}");
        let mut request = self.http_client.post(url).json(draft);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_HEADER, key);
        }
        let response = send(request, token).await?;
        parse(response, "Failed to create note").await
    }

    /// Applies a partial update to a note.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on 401, or an error if the request fails.
    pub async fn update(&self, token: &str, id: &str, update: &NoteUpdate) -> Result<Note> {
        let url = self.endpoint(&["notes", id])?;
        debug!("PATCH {url}");
        let response = send(self.http_client.patch(url).json(update), token).await?;
        parse(response, "Failed to update note").await
    }

    /// Deletes a note.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] on 401, or an error if the request fails.
    pub async fn remove(&self, token: &str, id: &str) -> Result<()> {
        let url = self.endpoint(&["notes", id])?;
        debug!("DELETE {url}");
        let response = send(self.http_client.delete(url), token).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(error_from(response, "Failed to delete note").await)
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let url = self.endpoint(&["auth", "sign-in", "email"])?;
        debug!("POST {url}");
        let body = SignInRequest { email, password };
        let response = self.http_client.post(url).json(&body).send().await?;
        parse(response, "Sign in failed").await
    }

    /// Creates an account with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the sign-up or the request fails.
    pub async fn sign_up_with_email(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthResponse> {
        let url = self.endpoint(&["auth", "sign-up", "email"])?;
        debug!("POST {url}");
        let body = SignUpRequest {
            email,
            password,
            full_name,
        };
        let response = self.http_client.post(url).json(&body).send().await?;
        parse(response, "Sign up failed").await
    }

    /// Builds an endpoint URL by appending path segments to the API root.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidConfig(format!("API URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Sends an authenticated request, mapping 401 to [`Error::Unauthorized`].
async fn send(request: RequestBuilder, token: &str) -> Result<Response> {
    let response = request.bearer_auth(token).send().await?;
    if response.status() == StatusCode::UNAUTHORIZED {
        warn!("Server rejected the session credential");
        return Err(Error::Unauthorized);
    }
    Ok(response)
}

/// Parses a success body, or converts a failure body into an [`Error`].
async fn parse<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from(response, fallback).await);
    }
    Ok(response.json().await?)
}

async fn error_from(response: Response, fallback: &str) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let error: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();
    error.into_error(status, fallback)
}
