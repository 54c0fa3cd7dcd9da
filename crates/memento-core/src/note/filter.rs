//! Note list categories and filtering.

use chrono::{DateTime, Local, Utc};
use memento_api::Note;

/// Display category of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCategory {
    /// Plain or mood note.
    Mood,
    /// Time capsule with an unlock date.
    TimeCapsule,
    /// Secret (locked) note.
    Secret,
}

impl NoteCategory {
    /// Categorize a note. A locked note is always `Secret`.
    #[must_use]
    pub const fn of(note: &Note) -> Self {
        if note.is_locked {
            Self::Secret
        } else if note.is_time_capsule && note.unlock_date.is_some() {
            Self::TimeCapsule
        } else {
            Self::Mood
        }
    }

    /// Get display name for the category.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Mood => "Mood",
            Self::TimeCapsule => "Time Capsule",
            Self::Secret => "Secret Note",
        }
    }
}

/// Category filter for the note list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteFilter {
    /// Every note.
    #[default]
    All,
    /// Only mood notes.
    Mood,
    /// Only time capsules.
    TimeCapsule,
    /// Only secret notes.
    Secret,
}

impl NoteFilter {
    /// Returns true if a note of `category` passes this filter.
    #[must_use]
    pub const fn accepts(self, category: NoteCategory) -> bool {
        matches!(
            (self, category),
            (Self::All, _)
                | (Self::Mood, NoteCategory::Mood)
                | (Self::TimeCapsule, NoteCategory::TimeCapsule)
                | (Self::Secret, NoteCategory::Secret)
        )
    }
}

/// Returns true if `note` is a time capsule whose unlock day has not arrived.
///
/// Compared by local calendar day, so a capsule opens at local midnight.
#[must_use]
pub fn is_sealed(note: &Note, now: DateTime<Utc>) -> bool {
    match (note.is_time_capsule, note.unlock_date) {
        (true, Some(unlock)) => {
            unlock.with_timezone(&Local).date_naive() > now.with_timezone(&Local).date_naive()
        }
        _ => false,
    }
}

/// Filter notes by category and a case-insensitive search over title and content.
///
/// Order of `notes` is preserved.
#[must_use]
pub fn filter_notes<'a>(notes: &'a [Note], filter: NoteFilter, query: &str) -> Vec<&'a Note> {
    let query = query.to_lowercase();
    notes
        .iter()
        .filter(|note| filter.accepts(NoteCategory::of(note)))
        .filter(|note| {
            query.is_empty()
                || note.title.to_lowercase().contains(&query)
                || note.content.to_lowercase().contains(&query)
        })
        .collect()
}
