use std::fmt;

use chrono::{DateTime, Utc};

use crate::store::StoredIdentity;

/// One matchable identity in a gallery snapshot.
#[derive(Clone)]
pub struct GalleryEntry {
    pub id: i64,
    pub name: String,
    pub embedding: Vec<f32>,
}

impl fmt::Debug for GalleryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GalleryEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("embedding_len", &self.embedding.len())
            .finish()
    }
}

/// Immutable, ordered set of enrolled identities.
///
/// Entry order is store order (ascending id, i.e. enrollment order) and
/// decides ties during matching. A snapshot is never modified after it is
/// built; the cache replaces it wholesale.
#[derive(Debug, Clone)]
pub struct GallerySnapshot {
    entries: Vec<GalleryEntry>,
    loaded_at: DateTime<Utc>,
}

impl GallerySnapshot {
    /// The snapshot published before the first load.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self {
            entries,
            loaded_at: Utc::now(),
        }
    }

    /// Builds a snapshot from store rows.
    ///
    /// Rows without an embedding are not matchable and are dropped. Rows
    /// whose embedding length is not `dim` are dropped with a warning.
    /// Returns the snapshot and the number of mismatched rows.
    pub fn from_rows(rows: Vec<StoredIdentity>, dim: usize) -> (Self, usize) {
        let mut mismatched = 0usize;
        let entries = rows
            .into_iter()
            .filter_map(|row| {
                let embedding = row.embedding?;
                if embedding.len() != dim {
                    tracing::warn!(
                        id = row.id,
                        name = %row.name,
                        expected = dim,
                        got = embedding.len(),
                        "gallery: embedding dimension mismatch, excluding identity"
                    );
                    mismatched += 1;
                    return None;
                }
                Some(GalleryEntry {
                    id: row.id,
                    name: row.name,
                    embedding,
                })
            })
            .collect();
        (Self::new(entries), mismatched)
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Names in snapshot order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&GalleryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl Default for GallerySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
