//! Key-value record storage backed by `SQLite`.

use chrono::{DateTime, Utc};
use memento_api::{Note, User};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::{SqliteExecutor, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::Result;
use crate::outbox::{Outbox, PendingNote, SyncOperation};
use crate::session::Session;

const CACHED_NOTES: &str = "cached_notes";
const PENDING_NOTES: &str = "pending_notes";
const SYNC_QUEUE: &str = "sync_queue";
const AUTH_TOKEN: &str = "auth_token";
const USER_DATA: &str = "user_data";

const ALL_KEYS: [&str; 5] = [CACHED_NOTES, PENDING_NOTES, SYNC_QUEUE, AUTH_TOKEN, USER_DATA];

/// Durable local store for the note cache, the outbox and the session.
///
/// Each collection is one JSON record keyed by name. Reads never fail: a
/// missing or unreadable record is treated as empty and logged. Writes
/// report failures.
///
/// Read-modify-write cycles on the outbox and on the cache are serialized
/// by per-table locks, so concurrent writers cannot lose each other's
/// updates.
pub struct LocalStore {
    pool: SqlitePool,
    outbox_lock: Mutex<()>,
    cache_lock: Mutex<()>,
}

impl LocalStore {
    /// Open (or create) the store at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self::with_pool(pool);
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::with_pool(pool);
        store.initialize().await?;
        Ok(store)
    }

    fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            outbox_lock: Mutex::new(()),
            cache_lock: Mutex::new(()),
        }
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ---- cache ----

    /// Replace the cached server notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_cache(&self, notes: &[Note]) -> Result<()> {
        let _guard = self.cache_lock.lock().await;
        write_record(&self.pool, CACHED_NOTES, &notes).await
    }

    /// Cached server notes; empty if missing or unreadable.
    pub async fn get_cache(&self) -> Vec<Note> {
        self.read_list(CACHED_NOTES).await
    }

    /// When the cache was last written, if ever.
    pub async fn cache_updated_at(&self) -> Option<DateTime<Utc>> {
        let row = sqlx::query("SELECT updated_at FROM records WHERE key = ?")
            .bind(CACHED_NOTES)
            .fetch_optional(&self.pool)
            .await
            .ok()??;
        let updated_at: String = row.get("updated_at");
        DateTime::parse_from_rfc3339(&updated_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    // ---- outbox ----

    /// Replace the pending-note table on its own.
    ///
    /// Prefer [`LocalStore::update_outbox`], which keeps the queue in step.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_pending(&self, notes: &[PendingNote]) -> Result<()> {
        let _guard = self.outbox_lock.lock().await;
        write_record(&self.pool, PENDING_NOTES, &notes).await
    }

    /// Pending notes; empty if missing or unreadable.
    pub async fn get_pending(&self) -> Vec<PendingNote> {
        self.read_list(PENDING_NOTES).await
    }

    /// Replace the sync queue on its own.
    ///
    /// Prefer [`LocalStore::update_outbox`], which keeps the pending notes in step.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_queue(&self, queue: &[SyncOperation]) -> Result<()> {
        let _guard = self.outbox_lock.lock().await;
        write_record(&self.pool, SYNC_QUEUE, &queue).await
    }

    /// Queued operations; empty if missing or unreadable.
    pub async fn get_queue(&self) -> Vec<SyncOperation> {
        self.read_list(SYNC_QUEUE).await
    }

    /// Snapshot of pending notes and queue together.
    pub async fn get_outbox(&self) -> Outbox {
        let _guard = self.outbox_lock.lock().await;
        self.load_outbox().await
    }

    /// Run `f` against the outbox and persist the result atomically.
    ///
    /// The outbox lock is held from the read until both tables are
    /// committed in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the stored outbox is then unchanged.
    pub async fn update_outbox<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Outbox) -> R,
    {
        let _guard = self.outbox_lock.lock().await;
        let mut outbox = self.load_outbox().await;
        let result = f(&mut outbox);

        let (pending, queue) = outbox.into_parts();
        self.save_outbox(&pending, &queue).await?;
        Ok(result)
    }

    async fn load_outbox(&self) -> Outbox {
        let pending = self.read_list(PENDING_NOTES).await;
        let queue = self.read_list(SYNC_QUEUE).await;
        Outbox::from_parts(pending, queue)
    }

    async fn save_outbox(&self, pending: &[PendingNote], queue: &[SyncOperation]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_record(&mut *tx, PENDING_NOTES, &pending).await?;
        write_record(&mut *tx, SYNC_QUEUE, &queue).await?;
        tx.commit().await?;

        debug!("Saved outbox: {} pending, {} queued", pending.len(), queue.len());
        Ok(())
    }

    // ---- session ----

    /// Persist the session token and user.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_record(&mut *tx, AUTH_TOKEN, &session.token).await?;
        write_record(&mut *tx, USER_DATA, &session.user).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Load the stored session, if both token and user are present.
    pub async fn load_session(&self) -> Option<Session> {
        let token = self.read_logged::<String>(AUTH_TOKEN).await?;
        let user = self.read_logged::<User>(USER_DATA).await?;
        Some(Session { token, user })
    }

    /// Delete every record: session, cache, pending notes and queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear_all(&self) -> Result<()> {
        let _outbox = self.outbox_lock.lock().await;
        let _cache = self.cache_lock.lock().await;

        let mut tx = self.pool.begin().await?;
        for key in ALL_KEYS {
            sqlx::query("DELETE FROM records WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // ---- helpers ----

    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read_logged(key).await.unwrap_or_default()
    }

    async fn read_logged<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_record(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {key}, treating as empty: {e}");
                None
            }
        }
    }

    async fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT value FROM records WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: String = row.get("value");
                Ok(Some(serde_json::from_str(&value)?))
            }
            None => Ok(None),
        }
    }
}

async fn write_record<'e, E, T>(executor: E, key: &str, value: &T) -> Result<()>
where
    E: SqliteExecutor<'e>,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)?;
    sqlx::query(
        r"
        INSERT INTO records (key, value, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(json)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use memento_api::NoteDraft;

    fn note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: "T".to_string(),
            content: "C".to_string(),
            color: None,
            mood: None,
            mood_emoji: None,
            selected_icon: None,
            is_locked: false,
            is_time_capsule: false,
            unlock_date: None,
            created_at: Utc::now(),
            is_offline: false,
        }
    }

    fn pending(id: &str) -> PendingNote {
        PendingNote::new(id.to_string(), NoteDraft::new("A", "a"), Utc::now())
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "me@example.com".to_string(),
            full_name: Some("Me".to_string()),
            profile_picture: None,
            gender: None,
            birth_date: None,
        }
    }

    #[tokio::test]
    async fn test_empty_store_reads_empty() {
        let store = LocalStore::in_memory().await.unwrap();
        assert!(store.get_cache().await.is_empty());
        assert!(store.get_pending().await.is_empty());
        assert!(store.get_queue().await.is_empty());
        assert!(store.load_session().await.is_none());
        assert!(store.cache_updated_at().await.is_none());
    }

    #[tokio::test]
    async fn test_cache_roundtrip() {
        let store = LocalStore::in_memory().await.unwrap();
        store.save_cache(&[note("1"), note("2")]).await.unwrap();

        let cached = store.get_cache().await;
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].id, "1");
        assert!(store.cache_updated_at().await.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_empty() {
        let store = LocalStore::in_memory().await.unwrap();
        write_record(&store.pool, CACHED_NOTES, "not a list").await.unwrap();
        assert!(store.get_cache().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_outbox_writes_both_tables() {
        let store = LocalStore::in_memory().await.unwrap();
        store
            .update_outbox(|outbox| outbox.enqueue(pending("t1")))
            .await
            .unwrap();

        assert_eq!(store.get_pending().await.len(), 1);
        let queue = store.get_queue().await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "t1");

        let removed = store
            .update_outbox(|outbox| outbox.remove("t1"))
            .await
            .unwrap();
        assert!(removed.is_some());
        assert!(store.get_pending().await.is_empty());
        assert!(store.get_queue().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let store = std::sync::Arc::new(LocalStore::in_memory().await.unwrap());

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_outbox(|outbox| outbox.enqueue(pending(&format!("t{i}"))))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let outbox = store.get_outbox().await;
        assert_eq!(outbox.pending().len(), 10);
        assert_eq!(outbox.queue().len(), 10);
    }

    #[tokio::test]
    async fn test_session_and_clear_all() {
        let store = LocalStore::in_memory().await.unwrap();
        let session = Session {
            token: "tok".to_string(),
            user: user(),
        };
        store.save_session(&session).await.unwrap();
        store.save_cache(&[note("1")]).await.unwrap();
        store
            .update_outbox(|outbox| outbox.enqueue(pending("t1")))
            .await
            .unwrap();

        let loaded = store.load_session().await.unwrap();
        assert_eq!(loaded.token, "tok");
        assert_eq!(loaded.user.id, "u1");

        store.clear_all().await.unwrap();
        assert!(store.load_session().await.is_none());
        assert!(store.get_cache().await.is_empty());
        assert!(store.get_outbox().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memento.db");
        let path = path.to_str().unwrap();

        {
            let store = LocalStore::new(path).await.unwrap();
            store.save_cache(&[note("1")]).await.unwrap();
        }

        let store = LocalStore::new(path).await.unwrap();
        assert_eq!(store.get_cache().await.len(), 1);
    }
}
