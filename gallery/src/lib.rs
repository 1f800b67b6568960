//! Face identification via nearest-neighbour embedding matching over a
//! store-backed gallery cache.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use facekit_embed::RemoteEmbedder;
//! use facekit_gallery::{FaceGallery, GalleryConfig, RedbStore};
//!
//! let store = Arc::new(RedbStore::open("faces.redb")?);
//! let embedder = Arc::new(RemoteEmbedder::new("http://127.0.0.1:5001"));
//! let gallery = FaceGallery::open(GalleryConfig::default(), store, embedder).await?;
//!
//! gallery.enroll("alice", &alice_jpg).await?;
//! let r = gallery.recognize(&query_jpg).await?;
//! println!("{} known={} distance={:?}", r.name, r.is_known, r.distance);
//! ```
//!
//! # Design
//!
//! The gallery is an immutable [`GallerySnapshot`] published by
//! [`GalleryCache`]. Reads clone the current `Arc` and never block. Every
//! mutation goes through [`EnrollmentCoordinator`], which holds one write mutex
//! across duplicate check, store write and a full reload, so a mutation is
//! visible to every call that starts after it returns.
//!
//! Every mutation re-reads the whole store. This is O(gallery size) per write
//! and intended for small to moderate galleries.

mod cache;
mod config;
mod coordinator;
mod distance;
mod duplicate;
mod error;
mod matcher;
pub mod photos;
mod reconcile;
mod redb_store;
mod service;
mod snapshot;
mod store;
mod types;

pub use cache::GalleryCache;
pub use config::{DEFAULT_DIMENSION, DEFAULT_THRESHOLD, GalleryConfig};
pub use coordinator::EnrollmentCoordinator;
pub use distance::euclidean_distance;
pub use duplicate::{Duplicate, check_duplicate};
pub use error::GalleryError;
pub use matcher::{MatchResult, NO_GALLERY_NAME, UNKNOWN_NAME, classify, nearest};
pub use photos::{PhotoBatch, cleanup_orphaned_photos, load_reference_photos};
pub use reconcile::{ReconcileReport, ReconciliationRunner, ReferencePhoto, SkipReason, SkippedItem};
pub use redb_store::RedbStore;
pub use service::FaceGallery;
pub use snapshot::{GalleryEntry, GallerySnapshot};
pub use store::{MemoryStore, Store, StoredIdentity};
pub use types::{
    DeleteResult, EnrollResult, GalleryStatus, Identifier, KnownFace, KnownFaces, NO_FACE_NAME,
    RecognitionResult, RecognitionStatus, RefreshResult,
};
