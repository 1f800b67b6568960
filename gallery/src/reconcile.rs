use std::fmt;
use std::sync::Arc;

use facekit_embed::{EmbedError, Embedder};
use serde::Serialize;

use crate::GalleryError;
use crate::cache::GalleryCache;
use crate::coordinator::{EnrollmentCoordinator, validate_name};
use crate::duplicate::check_duplicate;
use crate::store::Store;

/// One externally supplied reference image.
#[derive(Clone)]
pub struct ReferencePhoto {
    pub name: String,
    pub image: Vec<u8>,
}

impl fmt::Debug for ReferencePhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferencePhoto")
            .field("name", &self.name)
            .field("image_len", &self.image.len())
            .finish()
    }
}

/// Why a batch item was not enrolled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyEnrolled,
    InvalidName,
    NoFaceDetected,
    InvalidImage { message: String },
    EmbedderFailed { message: String },
    DimensionMismatch { expected: usize, got: usize },
    Duplicate { existing_name: String, distance: f32 },
    StoreFailed { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyEnrolled => write!(f, "already enrolled"),
            Self::InvalidName => write!(f, "blank name"),
            Self::NoFaceDetected => write!(f, "no face detected"),
            Self::InvalidImage { message } => write!(f, "invalid image: {message}"),
            Self::EmbedderFailed { message } => write!(f, "face encoder failed: {message}"),
            Self::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
            Self::Duplicate {
                existing_name,
                distance,
            } => write!(f, "already enrolled as '{existing_name}' (distance {distance:.4})"),
            Self::StoreFailed { message } => write!(f, "store write failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub name: String,
    pub reason: SkipReason,
}

/// Summary of one reconciliation batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Names written to the store, in batch order.
    pub registered: Vec<String>,
    pub skipped: Vec<SkippedItem>,
    /// Gallery size after the final reload.
    pub total: usize,
}

impl ReconcileReport {
    fn skip(&mut self, name: &str, reason: SkipReason) {
        if reason == SkipReason::AlreadyEnrolled {
            tracing::debug!(name, "reconcile: already enrolled, skipping");
        } else {
            tracing::warn!(name, %reason, "reconcile: skipping");
        }
        self.skipped.push(SkippedItem {
            name: name.to_string(),
            reason,
        });
    }

    /// Items that failed rather than being already present.
    pub fn failed(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason != SkipReason::AlreadyEnrolled)
            .count()
    }
}

/// Enrolls a batch of reference photos with a single gallery reload.
///
/// Extraction runs without any lock. The store writes then run under the
/// coordinator's write mutex, each checked for duplicates against the
/// snapshot published when the batch took the mutex. Items within the same
/// batch are not checked against each other.
pub struct ReconciliationRunner {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn Store>,
    cache: Arc<GalleryCache>,
    coordinator: Arc<EnrollmentCoordinator>,
}

impl ReconciliationRunner {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn Store>,
        cache: Arc<GalleryCache>,
        coordinator: Arc<EnrollmentCoordinator>,
    ) -> Self {
        Self {
            embedder,
            store,
            cache,
            coordinator,
        }
    }

    /// Processes the whole batch; per-item failures are reported in the
    /// result. Only a failure of the final reload is returned as an error.
    pub async fn run(&self, photos: Vec<ReferencePhoto>) -> Result<ReconcileReport, GalleryError> {
        let mut report = ReconcileReport::default();
        let dim = self.cache.dimension();

        let known = self.cache.current();
        let mut extracted: Vec<(String, Vec<f32>)> = Vec::new();
        for photo in photos {
            let Ok(name) = validate_name(&photo.name) else {
                report.skip(&photo.name, SkipReason::InvalidName);
                continue;
            };
            if known.contains_name(name) || extracted.iter().any(|(n, _)| n == name) {
                report.skip(name, SkipReason::AlreadyEnrolled);
                continue;
            }

            match self.embedder.extract(&photo.image).await {
                Ok(emb) if emb.len() != dim => report.skip(
                    name,
                    SkipReason::DimensionMismatch {
                        expected: dim,
                        got: emb.len(),
                    },
                ),
                Ok(emb) => extracted.push((name.to_string(), emb)),
                Err(e) => report.skip(name, extract_skip(e, dim)),
            }
        }
        drop(known);

        let _guard = self.coordinator.write_guard().await;
        let snapshot = self.cache.current();
        let threshold = self.coordinator.duplicate_threshold();

        for (name, emb) in extracted {
            // Enrolled by someone else while we were extracting.
            if snapshot.contains_name(&name) {
                report.skip(&name, SkipReason::AlreadyEnrolled);
                continue;
            }
            if let Some(dup) = check_duplicate(&emb, &snapshot, threshold) {
                report.skip(
                    &name,
                    SkipReason::Duplicate {
                        existing_name: dup.name,
                        distance: dup.distance,
                    },
                );
                continue;
            }
            match self.store.upsert(&name, &emb).await {
                Ok(person_id) => {
                    tracing::info!(name = %name, person_id, "reconcile: registered");
                    report.registered.push(name);
                }
                Err(e) => report.skip(
                    &name,
                    SkipReason::StoreFailed {
                        message: e.to_string(),
                    },
                ),
            }
        }

        report.total = self.cache.reload().await?.len();
        tracing::info!(
            registered = report.registered.len(),
            skipped = report.skipped.len(),
            failed = report.failed(),
            total = report.total,
            "reconcile: batch complete"
        );
        Ok(report)
    }
}

fn extract_skip(e: EmbedError, dim: usize) -> SkipReason {
    match e {
        EmbedError::NoFaceDetected => SkipReason::NoFaceDetected,
        EmbedError::DimensionMismatch { got, .. } => SkipReason::DimensionMismatch { expected: dim, got },
        EmbedError::EmptyInput => SkipReason::InvalidImage {
            message: "empty image".to_string(),
        },
        EmbedError::InvalidImage(message) => SkipReason::InvalidImage { message },
        EmbedError::Api(message) => SkipReason::EmbedderFailed { message },
    }
}
