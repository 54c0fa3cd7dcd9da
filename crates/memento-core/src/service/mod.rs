//! Note service.
//!
//! Entry point for UI code: session lifecycle, the merged note list and
//! note writes that fall back to the offline queue.

mod notes;

pub use notes::{CreateOutcome, NoteService};
