use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embed: empty image")]
    EmptyInput,

    #[error("embed: invalid image: {0}")]
    InvalidImage(String),

    #[error("embed: no face detected")]
    NoFaceDetected,

    #[error("embed: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embed: API error: {0}")]
    Api(String),
}
