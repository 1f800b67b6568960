use thiserror::Error;

use facekit_embed::EmbedError;

/// Errors returned by gallery operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery: invalid image: {0}")]
    InvalidImage(String),

    #[error("gallery: no face detected")]
    NoFaceDetected,

    #[error("gallery: face already enrolled as '{existing_name}' (distance {distance:.4})")]
    DuplicateFace { existing_name: String, distance: f32 },

    #[error("gallery: identity '{identifier}' not found")]
    NotFound { identifier: String },

    #[error("gallery: store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("gallery: face encoder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("gallery: embedding dimension mismatch: expected {expected}, got {got}")]
    EmbeddingDimensionMismatch { expected: usize, got: usize },

    #[error("gallery: invalid name: {0:?}")]
    InvalidName(String),

    #[error("gallery: invalid config: {0}")]
    InvalidConfig(String),

    #[error("gallery: io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EmbedError> for GalleryError {
    fn from(e: EmbedError) -> Self {
        match e {
            EmbedError::NoFaceDetected => GalleryError::NoFaceDetected,
            EmbedError::DimensionMismatch { expected, got } => {
                GalleryError::EmbeddingDimensionMismatch { expected, got }
            }
            EmbedError::EmptyInput => GalleryError::InvalidImage("empty image".to_string()),
            EmbedError::InvalidImage(msg) => GalleryError::InvalidImage(msg),
            EmbedError::Api(msg) => GalleryError::EmbedderUnavailable(msg),
        }
    }
}
