use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::GalleryError;
use crate::cache::GalleryCache;
use crate::duplicate::check_duplicate;
use crate::store::Store;
use crate::types::{DeleteResult, EnrollResult, Identifier};

/// Serializes gallery mutations.
///
/// Every mutation runs duplicate check, store write and cache reload while
/// holding a single write mutex, and publishes the new snapshot before the
/// mutex is released. Readers never take this mutex.
pub struct EnrollmentCoordinator {
    store: Arc<dyn Store>,
    cache: Arc<GalleryCache>,
    duplicate_threshold: f32,
    write: Mutex<()>,
}

impl EnrollmentCoordinator {
    pub fn new(store: Arc<dyn Store>, cache: Arc<GalleryCache>, duplicate_threshold: f32) -> Self {
        Self {
            store,
            cache,
            duplicate_threshold,
            write: Mutex::new(()),
        }
    }

    /// Enrolls `embedding` under `name`, replacing any embedding already
    /// stored for that name.
    ///
    /// Fails with [`GalleryError::DuplicateFace`] without touching the store
    /// when the embedding matches an enrolled identity.
    pub async fn enroll(&self, name: &str, embedding: &[f32]) -> Result<EnrollResult, GalleryError> {
        let name = validate_name(name)?;
        let dim = self.cache.dimension();
        if embedding.len() != dim {
            return Err(GalleryError::EmbeddingDimensionMismatch {
                expected: dim,
                got: embedding.len(),
            });
        }

        let _guard = self.write.lock().await;

        let snapshot = self.cache.current();
        if let Some(dup) = check_duplicate(embedding, &snapshot, self.duplicate_threshold) {
            tracing::warn!(
                name,
                existing = %dup.name,
                distance = dup.distance,
                "gallery: enrollment rejected, face already registered"
            );
            return Err(GalleryError::DuplicateFace {
                existing_name: dup.name,
                distance: dup.distance,
            });
        }
        drop(snapshot);

        let person_id = self.store.upsert(name, embedding).await?;
        tracing::info!(name, person_id, "gallery: identity stored");

        self.reload_after_write(name).await?;

        Ok(EnrollResult {
            person_id,
            name: name.to_string(),
            message: format!("'{name}' registered successfully."),
        })
    }

    /// Deletes an identity by id or name.
    pub async fn delete(&self, identifier: &Identifier) -> Result<DeleteResult, GalleryError> {
        let _guard = self.write.lock().await;

        let person_id = match identifier {
            Identifier::Id(id) => *id,
            Identifier::Name(name) => self
                .store
                .find_id_by_name(name.trim())
                .await?
                .ok_or_else(|| not_found(identifier))?,
        };

        if !self.store.delete_by_id(person_id).await? {
            tracing::warn!(%identifier, "gallery: delete matched no identity");
            return Err(not_found(identifier));
        }
        tracing::info!(%identifier, person_id, "gallery: identity deleted");

        self.reload_after_write(&identifier.to_string()).await?;

        Ok(DeleteResult {
            person_id,
            message: format!("'{identifier}' deleted successfully."),
        })
    }

    /// Reloads the gallery from the store. Returns the new gallery size.
    pub async fn refresh(&self) -> Result<usize, GalleryError> {
        let _guard = self.write.lock().await;
        let snapshot = self.cache.reload().await?;
        Ok(snapshot.len())
    }

    /// Takes the write mutex for a batch of direct store writes.
    pub(crate) async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write.lock().await
    }

    pub(crate) fn duplicate_threshold(&self) -> f32 {
        self.duplicate_threshold
    }

    async fn reload_after_write(&self, subject: &str) -> Result<(), GalleryError> {
        if let Err(e) = self.cache.reload().await {
            tracing::error!(
                subject,
                error = %e,
                "gallery: store write succeeded but reload failed, serving stale gallery"
            );
            return Err(e);
        }
        Ok(())
    }
}

fn not_found(identifier: &Identifier) -> GalleryError {
    GalleryError::NotFound {
        identifier: identifier.to_string(),
    }
}

pub(crate) fn validate_name(name: &str) -> Result<&str, GalleryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GalleryError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::store::{MemoryStore, StoredIdentity};

    fn setup(dim: usize) -> (Arc<MemoryStore>, Arc<GalleryCache>, EnrollmentCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(GalleryCache::new(store.clone(), dim));
        let coord = EnrollmentCoordinator::new(store.clone(), cache.clone(), 0.6);
        (store, cache, coord)
    }

    #[tokio::test]
    async fn enroll_publishes_before_returning() {
        let (_store, cache, coord) = setup(2);
        let res = coord.enroll("alice", &[1.0, 0.0]).await.unwrap();
        assert_eq!(res.person_id, 1);
        assert_eq!(res.name, "alice");
        assert_eq!(cache.current().names(), vec!["alice"]);
    }

    #[tokio::test]
    async fn enroll_trims_and_rejects_blank_names() {
        let (_store, _cache, coord) = setup(2);
        assert_eq!(coord.enroll("  bob ", &[1.0, 0.0]).await.unwrap().name, "bob");
        assert!(matches!(
            coord.enroll("   ", &[0.0, 5.0]).await,
            Err(GalleryError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn enroll_rejects_wrong_dimension() {
        let (store, _cache, coord) = setup(3);
        let err = coord.enroll("alice", &[1.0, 0.0]).await.unwrap_err();
        assert!(matches!(
            err,
            GalleryError::EmbeddingDimensionMismatch { expected: 3, got: 2 }
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn duplicate_does_not_write() {
        let (store, cache, coord) = setup(2);
        coord.enroll("alice", &[1.0, 0.0]).await.unwrap();

        let err = coord.enroll("carol", &[1.0, 0.0]).await.unwrap_err();
        match err {
            GalleryError::DuplicateFace {
                existing_name,
                distance,
            } => {
                assert_eq!(existing_name, "alice");
                assert_eq!(distance, 0.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(cache.current().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_name_and_id() {
        let (_store, cache, coord) = setup(2);
        coord.enroll("alice", &[1.0, 0.0]).await.unwrap();
        let bob = coord.enroll("bob", &[0.0, 1.0]).await.unwrap();

        coord.delete(&Identifier::from("alice")).await.unwrap();
        assert_eq!(cache.current().names(), vec!["bob"]);

        let res = coord.delete(&Identifier::Id(bob.person_id)).await.unwrap();
        assert_eq!(res.person_id, bob.person_id);
        assert!(cache.current().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let (_store, cache, coord) = setup(2);
        coord.enroll("alice", &[1.0, 0.0]).await.unwrap();
        let before = cache.current();

        let err = coord.delete(&Identifier::from("nobody")).await.unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { identifier } if identifier == "nobody"));
        let err = coord.delete(&Identifier::Id(99)).await.unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { .. }));

        assert!(Arc::ptr_eq(&before, &cache.current()), "snapshot must not be replaced");
    }

    /// Store that accepts writes while its loads can be failed.
    struct ReadFailStore {
        inner: MemoryStore,
        fail_loads: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Store for ReadFailStore {
        async fn load_all(&self) -> Result<Vec<StoredIdentity>, GalleryError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(GalleryError::StoreUnavailable("read timeout".into()));
            }
            self.inner.load_all().await
        }
        async fn upsert(&self, name: &str, embedding: &[f32]) -> Result<i64, GalleryError> {
            self.inner.upsert(name, embedding).await
        }
        async fn find_id_by_name(&self, name: &str) -> Result<Option<i64>, GalleryError> {
            self.inner.find_id_by_name(name).await
        }
        async fn delete_by_id(&self, id: i64) -> Result<bool, GalleryError> {
            self.inner.delete_by_id(id).await
        }
        async fn ping(&self) -> Result<(), GalleryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn write_kept_when_reload_fails() {
        let store = Arc::new(ReadFailStore {
            inner: MemoryStore::new(),
            fail_loads: AtomicBool::new(false),
        });
        let cache = Arc::new(GalleryCache::new(store.clone(), 2));
        let coord = EnrollmentCoordinator::new(store.clone(), cache.clone(), 0.6);
        coord.enroll("alice", &[1.0, 0.0]).await.unwrap();
        let before = cache.current();

        store.fail_loads.store(true, Ordering::SeqCst);
        let err = coord.enroll("bob", &[0.0, 1.0]).await.unwrap_err();
        assert!(matches!(err, GalleryError::StoreUnavailable(_)));
        assert!(store.inner.find_id_by_name("bob").await.unwrap().is_some());
        assert!(Arc::ptr_eq(&before, &cache.current()));

        let err = coord.delete(&Identifier::from("alice")).await.unwrap_err();
        assert!(matches!(err, GalleryError::StoreUnavailable(_)));
        assert_eq!(store.inner.find_id_by_name("alice").await.unwrap(), None);
        assert_eq!(cache.current().names(), vec!["alice"]);

        // Once the store reads again, refresh catches up with both writes.
        store.fail_loads.store(false, Ordering::SeqCst);
        assert_eq!(coord.refresh().await.unwrap(), 1);
        assert_eq!(cache.current().names(), vec!["bob"]);
    }

    #[tokio::test]
    async fn delete_by_padded_name() {
        let (store, _cache, coord) = setup(2);
        coord.enroll("  carol  ", &[1.0, 0.0]).await.unwrap();
        let res = coord.delete(&Identifier::from(" carol")).await.unwrap();
        assert_eq!(res.person_id, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn refresh_sees_external_writes() {
        let (store, _cache, coord) = setup(2);
        assert_eq!(coord.refresh().await.unwrap(), 0);
        store.upsert("alice", &[1.0, 0.0]).await.unwrap();
        assert_eq!(coord.refresh().await.unwrap(), 1);
        assert_eq!(coord.refresh().await.unwrap(), 1);
    }
}
