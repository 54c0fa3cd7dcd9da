//! Reconciliation of queued operations and the merged read path.

mod merger;
mod reconciler;

pub use merger::{LoadOrigin, LoadOutcome, ReadMerger, merge_notes};
pub use reconciler::{Reconciler, SyncReport};
