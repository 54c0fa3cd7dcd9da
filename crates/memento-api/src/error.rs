//! Error types for note API operations.

use serde::Deserialize;

/// Result type alias for note API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Note API error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error (connection refused, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The server rejected the bearer credential (HTTP 401).
    #[error("Authentication expired. Please log in again.")]
    Unauthorized,

    /// Non-success response from the server.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the `error` field of the response body, if any.
        message: String,
    },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Creates an API error from a status code and message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the server rejected the session credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Error body returned by the server on failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    /// Human-readable error.
    #[serde(default)]
    pub error: String,
}

impl ErrorResponse {
    /// Converts to an [`Error`], using `fallback` when the body carried no message.
    pub(crate) fn into_error(self, status: u16, fallback: &str) -> Error {
        if self.error.is_empty() {
            Error::api(status, fallback)
        } else {
            Error::api(status, self.error)
        }
    }
}
