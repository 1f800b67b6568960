//! facegallery - face identification service.
//!
//! Loads the gallery from a redb file, enrolls any new reference photos, then
//! serves the HTTP API.

mod config;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use facekit_embed::{EmbedConfig, RemoteEmbedder};
use facekit_gallery::{FaceGallery, RedbStore, cleanup_orphaned_photos, load_reference_photos};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Face identification service.
#[derive(Parser, Debug)]
#[command(name = "facegallery")]
#[command(about = "Face identification service over a persistent gallery")]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (e.g. :8000)
    #[arg(short, long)]
    listen: Option<String>,

    /// Gallery database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Reference photo directory enrolled at startup
    #[arg(long)]
    photos: Option<PathBuf>,

    /// Face encoding service URL
    #[arg(long)]
    embedder_url: Option<String>,

    /// Recognition distance threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Delete reference photos of people no longer enrolled
    #[arg(long)]
    cleanup: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig> {
        let mut cfg = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(listen) = self.listen {
            cfg.listen = listen;
        }
        if let Some(database) = self.database {
            cfg.database = database;
        }
        if self.photos.is_some() {
            cfg.photos = self.photos;
        }
        if let Some(url) = self.embedder_url {
            cfg.embedder.base_url = url;
        }
        if let Some(threshold) = self.threshold {
            cfg.gallery.threshold = threshold;
        }
        cfg.cleanup_orphans |= self.cleanup;
        Ok(cfg)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let cfg = args.into_config()?;

    let store = RedbStore::open(&cfg.database)
        .with_context(|| format!("open gallery database {}", cfg.database.display()))?;
    let embedder = RemoteEmbedder::with_config(
        EmbedConfig::default()
            .with_base_url(&cfg.embedder.base_url)
            .with_api_key(&cfg.embedder.api_key)
            .with_model(&cfg.embedder.model)
            .with_dimension(cfg.gallery.dimension),
    );
    tracing::info!(
        database = %cfg.database.display(),
        embedder = embedder.base_url(),
        threshold = cfg.gallery.threshold,
        "starting"
    );

    let gallery = FaceGallery::open(cfg.gallery.clone(), Arc::new(store), Arc::new(embedder))
        .await
        .context("load gallery")?;
    let gallery = Arc::new(gallery);

    if let Some(dir) = &cfg.photos {
        sync_photos(&gallery, dir, cfg.cleanup_orphans).await?;
    }

    server::serve(&cfg.listen, gallery).await
}

/// Enrolls new reference photos and optionally removes orphaned ones.
async fn sync_photos(gallery: &FaceGallery, dir: &std::path::Path, cleanup: bool) -> Result<()> {
    let batch = load_reference_photos(dir)
        .with_context(|| format!("read reference photos from {}", dir.display()))?;
    for (path, err) in &batch.unreadable {
        tracing::warn!(path = %path.display(), error = %err, "unreadable reference photo");
    }

    let report = gallery.reconcile(batch.photos).await?;
    tracing::info!(
        registered = report.registered.len(),
        skipped = report.skipped.len(),
        failed = report.failed(),
        total = report.total,
        "reference photos reconciled"
    );

    if cleanup {
        let names = gallery.list_known().names;
        let removed = cleanup_orphaned_photos(dir, &names)?;
        tracing::info!(removed, "orphaned reference photos removed");
    }
    Ok(())
}
