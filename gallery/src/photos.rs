//! Reference photo directory: one image per person, named after the person.
//!
//! `alice.jpg` enrolls as `alice`. Only `.jpg`, `.jpeg` and `.png` files at
//! the top level of the directory are considered.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::GalleryError;
use crate::reconcile::ReferencePhoto;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Photos read from a directory, plus the files that could not be read.
#[derive(Debug, Default)]
pub struct PhotoBatch {
    pub photos: Vec<ReferencePhoto>,
    pub unreadable: Vec<(PathBuf, String)>,
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn image_files(dir: &Path) -> Result<Vec<PathBuf>, GalleryError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if is_image(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
}

/// Reads every reference photo in `dir`, sorted by file name.
pub fn load_reference_photos(dir: &Path) -> Result<PhotoBatch, GalleryError> {
    let mut batch = PhotoBatch::default();
    for path in image_files(dir)? {
        let Some(name) = stem(&path) else {
            batch
                .unreadable
                .push((path, "file name is not a usable person name".to_string()));
            continue;
        };
        match fs::read(&path) {
            Ok(image) => batch.photos.push(ReferencePhoto { name, image }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "photos: cannot read image");
                batch.unreadable.push((path, e.to_string()));
            }
        }
    }
    tracing::info!(
        dir = %dir.display(),
        found = batch.photos.len(),
        unreadable = batch.unreadable.len(),
        "photos: reference images loaded"
    );
    Ok(batch)
}

/// Deletes reference photos whose person is not in `names`.
/// Returns the number of files removed.
pub fn cleanup_orphaned_photos(dir: &Path, names: &[String]) -> Result<usize, GalleryError> {
    let keep: HashSet<&str> = names.iter().map(|n| n.as_str()).collect();
    let mut removed = 0usize;
    for path in image_files(dir)? {
        let orphan = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => !keep.contains(s),
            None => false,
        };
        if !orphan {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "photos: removed orphaned photo");
                removed += 1;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "photos: cannot remove orphaned photo");
            }
        }
    }
    Ok(removed)
}
