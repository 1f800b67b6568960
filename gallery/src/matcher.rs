use crate::distance::euclidean_distance;
use crate::snapshot::GallerySnapshot;

/// Name reported for a face that matched nobody.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Name reported when there is nothing to compare against.
pub const NO_GALLERY_NAME: &str = "No reference faces loaded";

/// Outcome of classifying one embedding against a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// Nearest entry is within threshold.
    Known { id: i64, name: String, distance: f32 },
    /// Nearest entry is farther than threshold.
    Unknown { distance: f32 },
    /// The snapshot is empty.
    NoReferenceGallery,
}

impl MatchResult {
    pub fn is_known(&self) -> bool {
        matches!(self, MatchResult::Known { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            MatchResult::Known { name, .. } => name,
            MatchResult::Unknown { .. } => UNKNOWN_NAME,
            MatchResult::NoReferenceGallery => NO_GALLERY_NAME,
        }
    }

    pub fn distance(&self) -> Option<f32> {
        match self {
            MatchResult::Known { distance, .. } | MatchResult::Unknown { distance } => {
                Some(*distance)
            }
            MatchResult::NoReferenceGallery => None,
        }
    }
}

/// Returns the index and distance of the entry nearest to `query`.
///
/// Entries are scanned in snapshot order and only a strictly smaller distance
/// replaces the current best, so the earliest entry wins ties. NaN distances
/// never win.
pub fn nearest(query: &[f32], snapshot: &GallerySnapshot) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, entry) in snapshot.entries().iter().enumerate() {
        let d = euclidean_distance(query, &entry.embedding);
        if d.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best
}

/// Classifies `query` as a known identity or unknown.
///
/// A match requires the nearest distance to be `<= threshold`.
pub fn classify(query: &[f32], snapshot: &GallerySnapshot, threshold: f32) -> MatchResult {
    if snapshot.is_empty() {
        return MatchResult::NoReferenceGallery;
    }

    let Some((idx, distance)) = nearest(query, snapshot) else {
        // Every distance was NaN.
        return MatchResult::Unknown {
            distance: f32::INFINITY,
        };
    };

    if distance <= threshold {
        let entry = &snapshot.entries()[idx];
        tracing::debug!(name = %entry.name, distance, "gallery: match");
        MatchResult::Known {
            id: entry.id,
            name: entry.name.clone(),
            distance,
        }
    } else {
        tracing::debug!(distance, threshold, "gallery: no match within threshold");
        MatchResult::Unknown { distance }
    }
}
