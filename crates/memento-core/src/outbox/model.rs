//! Pending note and sync queue models.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use memento_api::{Note, NoteDraft, NoteUpdate};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// User id given to pending notes when they are shown in the merged list.
pub const PENDING_USER_ID: &str = "temp";

/// A note created on this device that the server has not acknowledged yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingNote {
    /// Client-generated identity, used as the note id until sync succeeds.
    pub temp_id: String,
    /// Note fields as authored.
    #[serde(flatten)]
    pub payload: NoteDraft,
    /// When the note was created on this device.
    pub created_at: DateTime<Utc>,
    /// Always true; kept so stored records are self-describing.
    #[serde(default = "offline_marker")]
    pub is_offline: bool,
}

const fn offline_marker() -> bool {
    true
}

impl PendingNote {
    /// Creates a pending note from a draft.
    #[must_use]
    pub const fn new(temp_id: String, payload: NoteDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            temp_id,
            payload,
            created_at,
            is_offline: true,
        }
    }

    /// Projects this pending note into the shape of a synced note.
    ///
    /// The note's id is its `temp_id` and it is flagged `is_offline`.
    #[must_use]
    pub fn to_note(&self, user_id: &str) -> Note {
        let payload = self.payload.clone();
        Note {
            id: self.temp_id.clone(),
            user_id: user_id.to_string(),
            title: payload.title,
            content: payload.content,
            color: payload.color,
            mood: payload.mood,
            mood_emoji: payload.mood_emoji,
            selected_icon: payload.selected_icon,
            is_locked: payload.is_locked,
            is_time_capsule: payload.is_time_capsule,
            unlock_date: payload.unlock_date,
            created_at: self.created_at,
            is_offline: true,
        }
    }
}

/// Kind of queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Create the note on the server.
    Create,
    /// Reserved for pending notes; never produced.
    Update,
    /// Reserved for pending notes; never produced.
    Delete,
}

/// A queued remote operation derived from a pending note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Equals the `temp_id` of the pending note it came from.
    pub id: String,
    /// Operation kind.
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// Full pending note payload.
    pub data: PendingNote,
    /// When the operation was queued. Diagnostic only.
    pub timestamp: DateTime<Utc>,
}

impl SyncOperation {
    /// Creates the CREATE operation for a pending note.
    #[must_use]
    pub fn create(note: &PendingNote) -> Self {
        Self {
            id: note.temp_id.clone(),
            kind: OperationType::Create,
            data: note.clone(),
            timestamp: note.created_at,
        }
    }
}

/// The pending-note table and the sync queue, kept in lock-step.
///
/// Every pending note has exactly one operation with the same id and vice
/// versa. All mutations go through methods that touch both collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    pending: Vec<PendingNote>,
    queue: Vec<SyncOperation>,
}

impl Outbox {
    /// Builds an outbox from stored collections, repairing any drift.
    ///
    /// An operation without a pending note gets its note back from the
    /// operation payload; a pending note without an operation gets a new
    /// CREATE appended. Nothing is dropped.
    #[must_use]
    pub fn from_parts(mut pending: Vec<PendingNote>, mut queue: Vec<SyncOperation>) -> Self {
        let pending_ids: HashSet<String> = pending.iter().map(|n| n.temp_id.clone()).collect();
        let queued_ids: HashSet<String> = queue.iter().map(|op| op.id.clone()).collect();

        for op in &queue {
            if !pending_ids.contains(&op.id) {
                warn!("Restoring pending note {} from its queued operation", op.id);
                pending.push(op.data.clone());
            }
        }

        let orphans: Vec<SyncOperation> = pending
            .iter()
            .filter(|note| !queued_ids.contains(&note.temp_id))
            .map(SyncOperation::create)
            .collect();
        for op in orphans {
            warn!("Queueing missing CREATE for pending note {}", op.id);
            queue.push(op);
        }

        Self { pending, queue }
    }

    /// Splits the outbox into its two collections for storage.
    #[must_use]
    pub fn into_parts(self) -> (Vec<PendingNote>, Vec<SyncOperation>) {
        (self.pending, self.queue)
    }

    /// Pending notes in creation order.
    #[must_use]
    pub fn pending(&self) -> &[PendingNote] {
        &self.pending
    }

    /// Queued operations in enqueue order.
    #[must_use]
    pub fn queue(&self) -> &[SyncOperation] {
        &self.queue
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is waiting to sync.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns true if a pending note with this id exists.
    #[must_use]
    pub fn contains(&self, temp_id: &str) -> bool {
        self.find(temp_id).is_some()
    }

    /// Looks up a pending note.
    #[must_use]
    pub fn find(&self, temp_id: &str) -> Option<&PendingNote> {
        self.pending.iter().find(|n| n.temp_id == temp_id)
    }

    /// Appends a pending note and its CREATE operation.
    pub fn enqueue(&mut self, note: PendingNote) {
        self.queue.push(SyncOperation::create(&note));
        self.pending.push(note);
    }

    /// Removes a pending note and its operation. Returns the note if it existed.
    pub fn remove(&mut self, temp_id: &str) -> Option<PendingNote> {
        self.queue.retain(|op| op.id != temp_id);
        let index = self.pending.iter().position(|n| n.temp_id == temp_id)?;
        Some(self.pending.remove(index))
    }

    /// Applies an update to a pending note and to the payload of its operation.
    pub fn amend(&mut self, temp_id: &str, update: &NoteUpdate) -> Option<PendingNote> {
        let note = self.pending.iter_mut().find(|n| n.temp_id == temp_id)?;
        update.apply_to(&mut note.payload);
        let note = note.clone();

        if let Some(op) = self.queue.iter_mut().find(|op| op.id == temp_id) {
            op.data = note.clone();
        }
        Some(note)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pending(id: &str) -> PendingNote {
        PendingNote::new(id.to_string(), NoteDraft::new("A", "a"), Utc::now())
    }

    #[test]
    fn test_pending_note_json_shape() {
        let note = pending("t1");
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["tempId"], "t1");
        assert_eq!(value["title"], "A");
        assert_eq!(value["isOffline"], true);
        assert!(value.get("payload").is_none());

        let back: PendingNote = serde_json::from_value(value).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_operation_json_shape() {
        let op = SyncOperation::create(&pending("t1"));
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["id"], "t1");
        assert_eq!(value["type"], "CREATE");
        assert_eq!(value["data"]["tempId"], "t1");
    }

    #[test]
    fn test_projection() {
        let note = pending("t1").to_note(PENDING_USER_ID);
        assert_eq!(note.id, "t1");
        assert_eq!(note.user_id, "temp");
        assert!(note.is_offline);
    }

    #[test]
    fn test_enqueue_and_remove_keep_lock_step() {
        let mut outbox = Outbox::default();
        outbox.enqueue(pending("t1"));
        outbox.enqueue(pending("t2"));
        assert_eq!(outbox.pending().len(), 2);
        assert_eq!(outbox.queue().len(), 2);
        assert_eq!(outbox.queue()[0].id, "t1");

        let removed = outbox.remove("t1").unwrap();
        assert_eq!(removed.temp_id, "t1");
        assert_eq!(outbox.pending().len(), 1);
        assert_eq!(outbox.queue().len(), 1);
        assert!(outbox.remove("missing").is_none());
    }

    #[test]
    fn test_amend_updates_both_sides() {
        let mut outbox = Outbox::default();
        outbox.enqueue(pending("t1"));

        let update = NoteUpdate {
            title: Some("B".to_string()),
            ..NoteUpdate::default()
        };
        let amended = outbox.amend("t1", &update).unwrap();

        assert_eq!(amended.payload.title, "B");
        assert_eq!(outbox.pending()[0].payload.title, "B");
        assert_eq!(outbox.queue()[0].data.payload.title, "B");
    }

    #[test]
    fn test_from_parts_repairs_drift() {
        let a = pending("a");
        let b = pending("b");
        let outbox = Outbox::from_parts(vec![a], vec![SyncOperation::create(&b)]);

        assert_eq!(outbox.pending().len(), 2);
        assert_eq!(outbox.queue().len(), 2);
        assert!(outbox.contains("a"));
        assert!(outbox.contains("b"));
        assert_eq!(outbox.queue()[1].id, "a");
    }
}
