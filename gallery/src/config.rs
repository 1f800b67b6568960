use serde::{Deserialize, Serialize};

use crate::GalleryError;

/// Default embedding dimension (dlib-style face encodings).
pub const DEFAULT_DIMENSION: usize = facekit_embed::embed::DEFAULT_DIMENSION;

/// Default maximum Euclidean distance for a match.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Controls gallery behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Embedding dimension. Stored embeddings of any other length are
    /// excluded from the gallery. Default: 128.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum distance at which a query is recognized as a known identity.
    /// Lower = stricter (more unknowns). Default: 0.6.
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum distance at which an enrollment is rejected as a duplicate.
    /// Falls back to `threshold` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_threshold: Option<f32>,
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            threshold: DEFAULT_THRESHOLD,
            duplicate_threshold: None,
        }
    }
}

impl GalleryConfig {
    /// Threshold used by the duplicate guard.
    pub fn duplicate_threshold(&self) -> f32 {
        self.duplicate_threshold.unwrap_or(self.threshold)
    }

    pub fn validate(&self) -> Result<(), GalleryError> {
        if self.dimension == 0 {
            return Err(GalleryError::InvalidConfig(
                "dimension must be positive".to_string(),
            ));
        }
        check_threshold("threshold", self.threshold)?;
        if let Some(t) = self.duplicate_threshold {
            check_threshold("duplicate_threshold", t)?;
        }
        Ok(())
    }
}

fn check_threshold(field: &str, t: f32) -> Result<(), GalleryError> {
    if !t.is_finite() || t < 0.0 {
        return Err(GalleryError::InvalidConfig(format!(
            "{field} must be a finite non-negative number, got {t}"
        )));
    }
    Ok(())
}
