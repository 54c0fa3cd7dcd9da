//! Draft validation.

use chrono::{DateTime, Utc};
use memento_api::NoteDraft;

/// Validation error for a note draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty or whitespace.
    EmptyTitle,
    /// Content is empty or whitespace.
    EmptyContent,
    /// Time capsule without an unlock date.
    MissingUnlockDate,
    /// Time capsule whose unlock date is not in the future.
    UnlockDateNotInFuture,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "Title is required",
            Self::EmptyContent => "Content is required",
            Self::MissingUnlockDate => "Missing unlock date for time capsule note",
            Self::UnlockDateNotInFuture => "Unlock date must be in the future",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle => "title",
            Self::EmptyContent => "content",
            Self::MissingUnlockDate | Self::UnlockDateNotInFuture => "unlockDate",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a draft.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a draft before it is submitted or queued.
///
/// Returns `Ok(())` if valid, or every problem found.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_draft(draft: &NoteDraft, now: DateTime<Utc>) -> ValidationResult {
    let mut errors = Vec::new();

    if draft.title.trim().is_empty() {
        errors.push(ValidationError::EmptyTitle);
    }
    if draft.content.trim().is_empty() {
        errors.push(ValidationError::EmptyContent);
    }

    if draft.is_time_capsule {
        match draft.unlock_date {
            None => errors.push(ValidationError::MissingUnlockDate),
            Some(unlock) if unlock <= now => errors.push(ValidationError::UnlockDateNotInFuture),
            Some(_) => {}
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
