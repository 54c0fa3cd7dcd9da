//! Sync reconciler: drains the operation queue against the server.

use std::sync::Arc;

use memento_api::Note;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::Error;
use crate::connectivity::Connectivity;
use crate::outbox::OperationType;
use crate::remote::RemoteNotes;
use crate::session::Session;
use crate::store::LocalStore;

/// Tallies from one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Operations the server accepted.
    pub success: usize,
    /// Operations left in the queue for the next pass.
    pub failed: usize,
    /// The server rejected the session during the pass.
    pub session_expired: bool,
}

impl SyncReport {
    /// Returns true if nothing was attempted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.success == 0 && self.failed == 0
    }

    /// User-facing summary of the pass.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Sync complete: {} succeeded, {} failed",
            self.success, self.failed
        )
    }
}

/// Drains the sync queue, one operation at a time in enqueue order.
pub struct Reconciler {
    connectivity: Arc<Connectivity>,
    store: Arc<LocalStore>,
    remote: RemoteNotes,
    pass: Mutex<()>,
}

impl Reconciler {
    /// Create a reconciler.
    #[must_use]
    pub fn new(
        connectivity: Arc<Connectivity>,
        store: Arc<LocalStore>,
        remote: RemoteNotes,
    ) -> Self {
        Self {
            connectivity,
            store,
            remote,
            pass: Mutex::new(()),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Offline or with an empty queue this is a no-op. Each accepted
    /// operation is removed from the queue together with its pending note
    /// as soon as the server acknowledges it; a rejected one stays queued
    /// unchanged. When anything synced, the cache is refreshed so the notes
    /// show up with their server ids. Never fails.
    pub async fn sync(&self, session: &Session) -> SyncReport {
        self.reconcile(session).await.0
    }

    /// Wait for a running pass to finish and keep new passes out until the
    /// guard is dropped.
    ///
    /// Local edits to pending notes hold this so they never race an
    /// in-flight submission of the same note.
    pub(crate) async fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.pass.lock().await
    }

    /// Like [`Self::sync`], also returning the server list if the pass
    /// refreshed the cache.
    pub(crate) async fn reconcile(&self, session: &Session) -> (SyncReport, Option<Vec<Note>>) {
        if !self.connectivity.is_connected() {
            debug!("Offline, skipping sync");
            return (SyncReport::default(), None);
        }

        let _pass = self.exclusive().await;
        let queue = self.store.get_outbox().await.queue().to_vec();
        if queue.is_empty() {
            return (SyncReport::default(), None);
        }

        info!("Syncing {} queued operations", queue.len());
        let mut report = SyncReport::default();

        for (index, op) in queue.iter().enumerate() {
            if op.kind != OperationType::Create {
                warn!("Leaving unsupported {:?} operation {} queued", op.kind, op.id);
                report.failed += 1;
                continue;
            }

            match self
                .remote
                .create(session, &op.data.payload, Some(&op.id))
                .await
            {
                Ok(note) => {
                    let dequeued = self
                        .store
                        .update_outbox(|outbox| outbox.remove(&op.id))
                        .await;
                    match dequeued {
                        Ok(_) => {
                            debug!("Synced {} as {}", op.id, note.id);
                            report.success += 1;
                        }
                        Err(e) => {
                            error!("Synced {} but could not dequeue it: {e}", op.id);
                            report.failed += 1;
                        }
                    }
                }
                Err(Error::AuthExpired) => {
                    warn!("Session expired during sync, abandoning pass");
                    report.failed += queue.len() - index;
                    report.session_expired = true;
                    return (report, None);
                }
                Err(e) => {
                    warn!("Failed to sync note {}: {e}", op.id);
                    report.failed += 1;
                }
            }
        }

        let mut refreshed = None;
        if report.success > 0 {
            match self.remote.refresh_cache(session).await {
                Ok(notes) => refreshed = Some(notes),
                Err(e) => warn!("Failed to refresh notes after sync: {e}"),
            }
        }

        info!("{}", report.summary());
        (report, refreshed)
    }
}
