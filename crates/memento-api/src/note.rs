//! Note wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note as returned by the server.
///
/// Notes created offline that have not been acknowledged by the server are
/// projected into this shape with `is_offline` set and a client-generated `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Server-assigned identifier (or temporary id for offline notes).
    pub id: String,
    /// Owner of the note.
    pub user_id: String,
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Mood label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Mood emoji.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_emoji: Option<String>,
    /// Icon picked by the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_icon: Option<String>,
    /// Whether the note is a secret note.
    #[serde(default)]
    pub is_locked: bool,
    /// Whether the note is a time capsule.
    #[serde(default)]
    pub is_time_capsule: bool,
    /// When a time capsule opens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set only for notes that exist solely on this device.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_offline: bool,
}

impl Note {
    /// Returns the editable fields of this note as a draft.
    #[must_use]
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            color: self.color.clone(),
            mood: self.mood.clone(),
            mood_emoji: self.mood_emoji.clone(),
            selected_icon: self.selected_icon.clone(),
            is_locked: self.is_locked,
            is_time_capsule: self.is_time_capsule,
            unlock_date: self.unlock_date,
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Mood label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Mood emoji.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_emoji: Option<String>,
    /// Icon picked by the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_icon: Option<String>,
    /// Whether the note is a secret note.
    #[serde(default)]
    pub is_locked: bool,
    /// Whether the note is a time capsule.
    #[serde(default)]
    pub is_time_capsule: bool,
    /// When a time capsule opens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_date: Option<DateTime<Utc>>,
}

impl NoteDraft {
    /// Creates a draft with a title and content.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets the display color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Sets the mood label and emoji.
    #[must_use]
    pub fn with_mood(mut self, mood: impl Into<String>, emoji: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self.mood_emoji = Some(emoji.into());
        self
    }

    /// Marks the draft as a secret note.
    #[must_use]
    pub const fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    /// Turns the draft into a time capsule opening at `unlock_date`.
    #[must_use]
    pub const fn time_capsule(mut self, unlock_date: DateTime<Utc>) -> Self {
        self.is_time_capsule = true;
        self.unlock_date = Some(unlock_date);
        self
    }
}

/// Body of a partial update request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// New mood label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// New mood emoji.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_emoji: Option<String>,
    /// New icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_icon: Option<String>,
    /// New secret flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    /// New time capsule flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_time_capsule: Option<bool>,
    /// New unlock date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_date: Option<DateTime<Utc>>,
}

impl NoteUpdate {
    /// Applies the present fields of this update to a draft.
    pub fn apply_to(&self, draft: &mut NoteDraft) {
        if let Some(title) = &self.title {
            draft.title.clone_from(title);
        }
        if let Some(content) = &self.content {
            draft.content.clone_from(content);
        }
        if self.color.is_some() {
            draft.color.clone_from(&self.color);
        }
        if self.mood.is_some() {
            draft.mood.clone_from(&self.mood);
        }
        if self.mood_emoji.is_some() {
            draft.mood_emoji.clone_from(&self.mood_emoji);
        }
        if self.selected_icon.is_some() {
            draft.selected_icon.clone_from(&self.selected_icon);
        }
        if let Some(locked) = self.is_locked {
            draft.is_locked = locked;
        }
        if let Some(capsule) = self.is_time_capsule {
            draft.is_time_capsule = capsule;
        }
        if self.unlock_date.is_some() {
            draft.unlock_date = self.unlock_date;
        }
    }
}
