use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::GalleryError;

/// A persisted identity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub id: i64,

    /// Unique, non-empty.
    pub name: String,

    /// `None` marks an identity that is not matchable.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistent table of identities keyed by unique name.
///
/// Implementations must be safe for concurrent use. Every I/O failure is
/// reported as [`GalleryError::StoreUnavailable`].
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Returns every identity in ascending id order.
    async fn load_all(&self) -> Result<Vec<StoredIdentity>, GalleryError>;

    /// Inserts `name` with `embedding`, or replaces the embedding (and bumps
    /// `updated_at`) if `name` exists. Returns the identity id.
    async fn upsert(&self, name: &str, embedding: &[f32]) -> Result<i64, GalleryError>;

    /// Returns the id registered for `name`.
    async fn find_id_by_name(&self, name: &str) -> Result<Option<i64>, GalleryError>;

    /// Removes an identity. Returns false if no row matched.
    async fn delete_by_id(&self, id: i64) -> Result<bool, GalleryError>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), GalleryError>;
}

/// In-memory [`Store`] implementation.
/// Data is lost on restart. Suitable for testing or ephemeral use.
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

struct MemoryStoreInner {
    rows: Vec<StoredIdentity>,
    seq: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreInner {
                rows: Vec::new(),
                seq: 0,
            }),
        }
    }

    /// Inserts an identity that has no embedding yet.
    /// Returns the existing id if `name` is already registered.
    pub fn reserve(&self, name: &str) -> i64 {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.iter().find(|r| r.name == name) {
            return row.id;
        }
        inner.insert(name, None)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemoryStoreInner {
    fn insert(&mut self, name: &str, embedding: Option<Vec<f32>>) -> i64 {
        self.seq += 1;
        let now = Utc::now();
        self.rows.push(StoredIdentity {
            id: self.seq,
            name: name.to_string(),
            embedding,
            created_at: now,
            updated_at: now,
        });
        self.seq
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn load_all(&self) -> Result<Vec<StoredIdentity>, GalleryError> {
        // Rows are appended with increasing ids, so insertion order is id order.
        Ok(self.inner.lock().rows.clone())
    }

    async fn upsert(&self, name: &str, embedding: &[f32]) -> Result<i64, GalleryError> {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.iter_mut().find(|r| r.name == name) {
            row.embedding = Some(embedding.to_vec());
            row.updated_at = Utc::now();
            return Ok(row.id);
        }
        Ok(inner.insert(name, Some(embedding.to_vec())))
    }

    async fn find_id_by_name(&self, name: &str) -> Result<Option<i64>, GalleryError> {
        let inner = self.inner.lock();
        Ok(inner.rows.iter().find(|r| r.name == name).map(|r| r.id))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, GalleryError> {
        let mut inner = self.inner.lock();
        let before = inner.rows.len();
        inner.rows.retain(|r| r.id != id);
        Ok(inner.rows.len() != before)
    }

    async fn ping(&self) -> Result<(), GalleryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_upsert_and_load() {
        let store = MemoryStore::new();
        let id1 = store.upsert("alice", &[1.0, 2.0]).await.unwrap();
        let id2 = store.upsert("bob", &[3.0, 4.0]).await.unwrap();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "alice");
        assert_eq!(all[1].embedding, Some(vec![3.0, 4.0]));
    }

    #[tokio::test]
    async fn memory_store_upsert_existing_keeps_id() {
        let store = MemoryStore::new();
        let id = store.upsert("alice", &[1.0]).await.unwrap();
        let created = store.load_all().await.unwrap()[0].created_at;

        let again = store.upsert("alice", &[2.0]).await.unwrap();
        assert_eq!(id, again);
        assert_eq!(store.len(), 1);

        let row = &store.load_all().await.unwrap()[0];
        assert_eq!(row.embedding, Some(vec![2.0]));
        assert_eq!(row.created_at, created);
        assert!(row.updated_at >= created);
    }

    #[tokio::test]
    async fn memory_store_find_and_delete() {
        let store = MemoryStore::new();
        let id = store.upsert("alice", &[1.0]).await.unwrap();
        assert_eq!(store.find_id_by_name("alice").await.unwrap(), Some(id));
        assert_eq!(store.find_id_by_name("nobody").await.unwrap(), None);

        assert!(store.delete_by_id(id).await.unwrap());
        assert!(!store.delete_by_id(id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn memory_store_reserve_has_no_embedding() {
        let store = MemoryStore::new();
        let id = store.reserve("pending");
        assert_eq!(store.reserve("pending"), id);

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].embedding.is_none());

        // Upsert fills the embedding in place.
        assert_eq!(store.upsert("pending", &[0.5]).await.unwrap(), id);
    }
}
