use reqwest::Client;

use crate::config::EmbedConfig;
use crate::embed::{DEFAULT_DIMENSION, Embedder};
use crate::error::EmbedError;

const REMOTE_BASE_URL: &str = "http://127.0.0.1:5001";

/// Embedder backed by an HTTP face-encoding service.
///
/// The service receives the raw image as a multipart `file` field and answers
/// with every face it found, in detection order. Only the first face is used.
pub struct RemoteEmbedder {
    client: Client,
    api_key: String,
    model: String,
    dim: usize,
    base_url: String,
}

impl RemoteEmbedder {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(EmbedConfig::default().with_base_url(base_url))
    }

    pub fn with_config(cfg: EmbedConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.api_key,
            model: cfg.model,
            dim: if cfg.dimension == 0 {
                DEFAULT_DIMENSION
            } else {
                cfg.dimension
            },
            base_url: if cfg.base_url.is_empty() {
                REMOTE_BASE_URL.to_string()
            } else {
                cfg.base_url.trim_end_matches('/').to_string()
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl Embedder for RemoteEmbedder {
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
        if image.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let resp = crate::wire::call_encode_api(
            &self.client,
            &self.api_key,
            &self.base_url,
            &self.model,
            image,
        )
        .await?;

        if let Some(location) = resp.faces.first().and_then(|f| f.location) {
            tracing::debug!(?location, "embed: face located");
        }
        if resp.faces.len() > 1 {
            tracing::debug!(
                faces = resp.faces.len(),
                "embed: multiple faces detected, using the first"
            );
        }
        crate::wire::first_face(resp, self.dim)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
