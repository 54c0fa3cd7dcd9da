//! Notes created offline and the queue of operations that will sync them.

mod factory;
mod model;

pub use factory::create_offline;
pub use model::{OperationType, Outbox, PENDING_USER_ID, PendingNote, SyncOperation};
