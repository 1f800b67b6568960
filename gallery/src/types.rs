use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::matcher::MatchResult;

/// Name reported when the image held no face.
pub const NO_FACE_NAME: &str = "No face detected";

/// How to address an identity for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Id(i64),
    Name(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{id}"),
            Identifier::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Id(id)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

/// Successful enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollResult {
    pub person_id: i64,
    pub name: String,
    pub message: String,
}

/// Successful deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub person_id: i64,
    pub message: String,
}

/// Terminal state of one recognition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionStatus {
    Known,
    Unknown,
    NoFaceDetected,
    NoReferenceGallery,
}

impl fmt::Display for RecognitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known => write!(f, "known"),
            Self::Unknown => write!(f, "unknown"),
            Self::NoFaceDetected => write!(f, "no_face_detected"),
            Self::NoReferenceGallery => write!(f, "no_reference_gallery"),
        }
    }
}

/// Answer to a recognition request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub status: RecognitionStatus,
    pub name: String,
    pub is_known: bool,
    pub distance: Option<f32>,
}

impl RecognitionResult {
    pub fn no_face() -> Self {
        Self {
            status: RecognitionStatus::NoFaceDetected,
            name: NO_FACE_NAME.to_string(),
            is_known: false,
            distance: None,
        }
    }
}

impl From<MatchResult> for RecognitionResult {
    fn from(m: MatchResult) -> Self {
        let status = match &m {
            MatchResult::Known { .. } => RecognitionStatus::Known,
            MatchResult::Unknown { .. } => RecognitionStatus::Unknown,
            MatchResult::NoReferenceGallery => RecognitionStatus::NoReferenceGallery,
        };
        Self {
            status,
            name: m.name().to_string(),
            is_known: m.is_known(),
            distance: m.distance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownFace {
    pub id: i64,
    pub name: String,
}

/// Identities currently loaded in the gallery, in gallery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownFaces {
    pub count: usize,
    pub names: Vec<String>,
    pub faces: Vec<KnownFace>,
}

impl KnownFaces {
    pub fn new(faces: Vec<KnownFace>) -> Self {
        Self {
            count: faces.len(),
            names: faces.iter().map(|f| f.name.clone()).collect(),
            faces,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryStatus {
    pub loaded_count: usize,
    pub store_connected: bool,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
    pub message: String,
    pub total: usize,
}
