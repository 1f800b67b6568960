//! Server configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use facekit_gallery::GalleryConfig;
use serde::Deserialize;

/// Configuration file format.
///
/// ```yaml
/// listen: ":8000"
/// database: faces.redb
/// photos: known_faces
/// embedder:
///   base_url: http://127.0.0.1:5001
///   api_key: $FACE_API_KEY
/// gallery:
///   threshold: 0.6
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub photos: Option<PathBuf>,
    #[serde(default)]
    pub cleanup_orphans: bool,
    #[serde(default)]
    pub embedder: EmbedderSection,
    #[serde(default)]
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedderSection {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

fn default_listen() -> String {
    ":8000".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("faces.redb")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            database: default_database(),
            photos: None,
            cleanup_orphans: false,
            embedder: EmbedderSection::default(),
            gallery: GalleryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a YAML config file, expanding `$VAR` in the embedder API key.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("parse {}", path.display()))
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cfg: ServerConfig = serde_yaml::from_slice(data)?;
        let raw = cfg.embedder.api_key.clone();
        cfg.embedder.api_key = expand_env(&raw);
        if cfg.embedder.api_key.is_empty() && !raw.is_empty() {
            tracing::warn!(api_key = %raw, "config: api key resolved to empty (env var not set?)");
        }
        Ok(cfg)
    }
}

/// Expand `$VAR` or `${VAR}`; other strings pass through.
fn expand_env(s: &str) -> String {
    let Some(rest) = s.strip_prefix('$') else {
        return s.to_string();
    };
    let var = rest
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(rest);
    std::env::var(var).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = ServerConfig::parse(b"{}").unwrap();
        assert_eq!(cfg.listen, ":8000");
        assert_eq!(cfg.database, PathBuf::from("faces.redb"));
        assert!(cfg.photos.is_none());
        assert_eq!(cfg.gallery.dimension, 128);
        assert_eq!(cfg.gallery.threshold, 0.6);
    }

    #[test]
    fn parses_sections() {
        let yaml = br#"
listen: "127.0.0.1:9000"
photos: known_faces
cleanup_orphans: true
embedder:
  base_url: http://encoder:5001
gallery:
  threshold: 0.5
  duplicate_threshold: 0.4
"#;
        let cfg = ServerConfig::parse(yaml).unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9000");
        assert_eq!(cfg.photos, Some(PathBuf::from("known_faces")));
        assert!(cfg.cleanup_orphans);
        assert_eq!(cfg.embedder.base_url, "http://encoder:5001");
        assert_eq!(cfg.gallery.threshold, 0.5);
        assert_eq!(cfg.gallery.duplicate_threshold(), 0.4);
    }

    #[test]
    fn expands_env_vars() {
        assert_eq!(expand_env("plain"), "plain");
        assert_eq!(expand_env(""), "");
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env("$PATH"), path);
        assert_eq!(expand_env("${PATH}"), path);
        assert_eq!(expand_env("$FACEGALLERY_SURELY_UNSET_VAR"), "");
    }
}
