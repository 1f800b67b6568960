use crate::error::EmbedError;

/// Reference embedding dimension of the dlib-style face encoder.
pub const DEFAULT_DIMENSION: usize = 128;

/// Embedder converts an encoded image (JPEG, PNG, ...) into a face embedding.
///
/// When the image contains several faces, implementations return the
/// embedding of the first face reported by the detector.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Return the embedding of the first face found in `image`.
    ///
    /// Fails with [`EmbedError::NoFaceDetected`] when the image decodes but
    /// contains no face, and [`EmbedError::InvalidImage`] when it cannot be
    /// decoded at all.
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError>;

    /// Return the dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
