//! Note drafts: validation and list filtering.
//!
//! The note wire types themselves live in `memento-api`.

mod filter;
mod validation;

pub use filter::{NoteCategory, NoteFilter, filter_notes, is_sealed};
pub use validation::{ValidationError, ValidationResult, validate_draft};
