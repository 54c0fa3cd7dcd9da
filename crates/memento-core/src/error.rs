//! Error types for the core library.

use thiserror::Error;

use crate::note::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote note API failed.
    #[error("API error: {0}")]
    Api(#[from] memento_api::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server rejected the session; local session state has been cleared.
    #[error("Session expired, please sign in again")]
    AuthExpired,

    /// No session is stored on this device.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// The operation needs connectivity.
    #[error("Offline: {0}")]
    Offline(String),

    /// Note not found locally or remotely.
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Draft failed validation.
    #[error("Invalid note: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if this error ended the session.
    #[must_use]
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
