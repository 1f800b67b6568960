use std::sync::Arc;

use facekit_embed::{EmbedError, Embedder};

use crate::GalleryError;
use crate::cache::GalleryCache;
use crate::config::GalleryConfig;
use crate::coordinator::EnrollmentCoordinator;
use crate::matcher::classify;
use crate::reconcile::{ReconcileReport, ReconciliationRunner, ReferencePhoto};
use crate::store::Store;
use crate::types::{
    DeleteResult, EnrollResult, GalleryStatus, Identifier, KnownFace, KnownFaces,
    RecognitionResult, RefreshResult,
};

/// Face identification service over a store-backed gallery.
///
/// Thread-safe: share it behind an `Arc`. Recognition and listing never wait
/// on enrollments; enroll, delete, refresh and reconcile run one at a time.
pub struct FaceGallery {
    cfg: GalleryConfig,
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    cache: Arc<GalleryCache>,
    coordinator: Arc<EnrollmentCoordinator>,
    runner: ReconciliationRunner,
}

impl FaceGallery {
    /// Validates `cfg` and loads the gallery from `store`.
    pub async fn open(
        cfg: GalleryConfig,
        store: Arc<dyn Store>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, GalleryError> {
        cfg.validate()?;
        if embedder.dimension() != cfg.dimension {
            return Err(GalleryError::InvalidConfig(format!(
                "embedder produces {}-d vectors, gallery expects {}",
                embedder.dimension(),
                cfg.dimension
            )));
        }

        let cache = Arc::new(GalleryCache::new(Arc::clone(&store), cfg.dimension));
        let coordinator = Arc::new(EnrollmentCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            cfg.duplicate_threshold(),
        ));
        let runner = ReconciliationRunner::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&coordinator),
        );

        let snapshot = cache.reload().await?;
        if !snapshot.is_empty() {
            tracing::info!(
                total = snapshot.len(),
                names = %snapshot.names().join(", "),
                "gallery: identities loaded"
            );
        }

        Ok(Self {
            cfg,
            store,
            embedder,
            cache,
            coordinator,
            runner,
        })
    }

    /// Extracts a face from `image` and enrolls it under `name`.
    pub async fn enroll(&self, name: &str, image: &[u8]) -> Result<EnrollResult, GalleryError> {
        let embedding = self.embedder.extract(image).await?;
        self.coordinator.enroll(name, &embedding).await
    }

    /// Identifies the first face in `image`.
    ///
    /// An image without a face is a normal answer, not an error.
    pub async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, GalleryError> {
        let embedding = match self.embedder.extract(image).await {
            Ok(e) => e,
            Err(EmbedError::NoFaceDetected) => {
                tracing::info!("gallery: no face in recognition image");
                return Ok(RecognitionResult::no_face());
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot = self.cache.current();
        let result = classify(&embedding, &snapshot, self.cfg.threshold);
        Ok(result.into())
    }

    pub async fn delete_identity(&self, identifier: &Identifier) -> Result<DeleteResult, GalleryError> {
        self.coordinator.delete(identifier).await
    }

    /// Identities in the published gallery.
    pub fn list_known(&self) -> KnownFaces {
        let snapshot = self.cache.current();
        let faces: Vec<KnownFace> = snapshot
            .entries()
            .iter()
            .map(|e| KnownFace {
                id: e.id,
                name: e.name.clone(),
            })
            .collect();
        KnownFaces::new(faces)
    }

    pub async fn status(&self) -> GalleryStatus {
        let snapshot = self.cache.current();
        let store_connected = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "gallery: store ping failed");
                false
            }
        };
        GalleryStatus {
            loaded_count: snapshot.len(),
            store_connected,
            loaded_at: snapshot.loaded_at(),
        }
    }

    pub async fn refresh(&self) -> Result<RefreshResult, GalleryError> {
        let total = self.coordinator.refresh().await?;
        Ok(RefreshResult {
            message: format!("Faces reloaded from store. Total: {total}"),
            total,
        })
    }

    /// Enrolls a batch of reference photos, reloading the gallery once.
    pub async fn reconcile(&self, photos: Vec<ReferencePhoto>) -> Result<ReconcileReport, GalleryError> {
        self.runner.run(photos).await
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.cfg
    }
}
