use crate::matcher::{MatchResult, classify};
use crate::snapshot::GallerySnapshot;

/// An enrolled identity that a candidate embedding already matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Duplicate {
    pub name: String,
    pub distance: f32,
}

/// Reports the identity `candidate` would be recognized as, if any.
///
/// Advisory against `snapshot` only: callers that need the answer to hold
/// until their write lands must check under the gallery write lock.
pub fn check_duplicate(
    candidate: &[f32],
    snapshot: &GallerySnapshot,
    threshold: f32,
) -> Option<Duplicate> {
    match classify(candidate, snapshot, threshold) {
        MatchResult::Known { name, distance, .. } => {
            tracing::warn!(existing = %name, distance, "gallery: possible duplicate face");
            Some(Duplicate { name, distance })
        }
        MatchResult::Unknown { .. } | MatchResult::NoReferenceGallery => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::GalleryEntry;

    fn snap() -> GallerySnapshot {
        GallerySnapshot::new(vec![
            GalleryEntry {
                id: 1,
                name: "alice".into(),
                embedding: vec![1.0, 0.0],
            },
            GalleryEntry {
                id: 2,
                name: "bob".into(),
                embedding: vec![0.0, 1.0],
            },
        ])
    }

    #[test]
    fn identical_embedding_is_duplicate() {
        let dup = check_duplicate(&[1.0, 0.0], &snap(), 0.6).unwrap();
        assert_eq!(dup.name, "alice");
        assert_eq!(dup.distance, 0.0);
    }

    #[test]
    fn distant_embedding_is_clear() {
        assert!(check_duplicate(&[5.0, 5.0], &snap(), 0.6).is_none());
    }

    #[test]
    fn empty_gallery_has_no_duplicates() {
        assert!(check_duplicate(&[1.0, 0.0], &GallerySnapshot::empty(), 0.6).is_none());
    }
}
