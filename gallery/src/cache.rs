use std::sync::Arc;

use parking_lot::RwLock;

use crate::GalleryError;
use crate::snapshot::GallerySnapshot;
use crate::store::Store;

/// Holds the currently published gallery snapshot.
///
/// Readers clone the `Arc` and work on that value; a concurrent reload builds
/// a new snapshot off to the side and swaps the pointer, so in-flight readers
/// keep a consistent view. The lock only ever guards the pointer swap.
pub struct GalleryCache {
    store: Arc<dyn Store>,
    dim: usize,
    current: RwLock<Arc<GallerySnapshot>>,
}

impl GalleryCache {
    /// Creates a cache that publishes an empty snapshot until the first load.
    pub fn new(store: Arc<dyn Store>, dim: usize) -> Self {
        Self {
            store,
            dim,
            current: RwLock::new(Arc::new(GallerySnapshot::empty())),
        }
    }

    /// Builds a fresh snapshot from the store without publishing it.
    /// On failure nothing changes.
    pub async fn load(&self) -> Result<Arc<GallerySnapshot>, GalleryError> {
        let rows = self.store.load_all().await?;
        let total = rows.len();
        let (snapshot, mismatched) = GallerySnapshot::from_rows(rows, self.dim);
        tracing::debug!(
            rows = total,
            loaded = snapshot.len(),
            mismatched,
            "gallery: snapshot built"
        );
        Ok(Arc::new(snapshot))
    }

    /// Returns the published snapshot.
    pub fn current(&self) -> Arc<GallerySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Atomically replaces the published snapshot.
    pub fn publish(&self, snapshot: Arc<GallerySnapshot>) {
        let size = snapshot.len();
        *self.current.write() = snapshot;
        tracing::info!(total = size, "gallery: snapshot published");
    }

    /// Loads from the store and publishes the result.
    pub async fn reload(&self) -> Result<Arc<GallerySnapshot>, GalleryError> {
        let snapshot = self.load().await?;
        self.publish(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }
}
