pub mod config;
pub mod embed;
pub mod error;
pub mod remote;
pub(crate) mod wire;

pub use config::EmbedConfig;
pub use embed::Embedder;
pub use error::EmbedError;
pub use remote::RemoteEmbedder;
