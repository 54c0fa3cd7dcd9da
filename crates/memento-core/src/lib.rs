//! # memento-core
//!
//! Offline-first note synchronization engine for the Memento client.
//!
//! This crate provides:
//! - **Connectivity oracle** - online checks and change subscriptions
//! - **Local storage** (`SQLite`) - note cache, pending notes, sync queue and session
//! - **Offline notes** - drafts queued locally while offline
//! - **Sync** - FIFO reconciliation of the queue against the server
//! - **Merged reads** - cache, pending and fresh server notes, newest first
//! - **Note service** - the facade UI code talks to
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use memento_core::{Connectivity, EngineConfig, NetworkState, NoteService};
//! use memento_api::NoteDraft;
//!
//! #[tokio::main]
//! async fn main() -> memento_core::Result<()> {
//!     let config = EngineConfig::new("https://api.example.com");
//!     let connectivity = Arc::new(Connectivity::new(NetworkState::online()));
//!     let service = Arc::new(NoteService::open(&config, connectivity.clone()).await?);
//!     let _auto_sync = service.spawn_auto_sync();
//!
//!     let session = service.sign_in("me@example.com", "secret").await?;
//!     let created = service.create(&session, &NoteDraft::new("Groceries", "Milk")).await?;
//!     if created.saved_offline {
//!         println!("Saved offline, will sync later");
//!     }
//!
//!     for note in service.load(&session, false).await.notes {
//!         println!("{} {}", note.created_at, note.title);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
pub mod connectivity;
mod error;
pub mod note;
pub mod outbox;
mod remote;
pub mod service;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use connectivity::{Connectivity, NetworkProbe, NetworkState, Subscription};
pub use error::{Error, Result};
pub use note::{
    NoteCategory, NoteFilter, ValidationError, ValidationResult, filter_notes, is_sealed,
    validate_draft,
};
pub use outbox::{OperationType, Outbox, PendingNote, SyncOperation, create_offline};
pub use remote::RemoteNotes;
pub use service::{CreateOutcome, NoteService};
pub use session::Session;
pub use store::LocalStore;
pub use sync::{LoadOrigin, LoadOutcome, ReadMerger, Reconciler, SyncReport, merge_notes};
