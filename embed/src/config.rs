use crate::embed::DEFAULT_DIMENSION;

/// Builder-style configuration for embedder implementations.
pub struct EmbedConfig {
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    pub api_key: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            dimension: DEFAULT_DIMENSION,
            base_url: String::new(),
            api_key: String::new(),
        }
    }
}

impl EmbedConfig {
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = dim;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = key.to_string();
        self
    }
}
