pub mod hash_embed;
pub mod local_model;
pub mod openai;
pub mod sqlite;

use async_trait::async_trait;

pub use hash_embed::HashEmbedder;
pub use local_model::FastEmbedder;
pub use openai::OpenAiClient;
pub use sqlite::SqliteChunkStore;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::Result;
use crate::ports::Embedder;

/// Embedder chosen by `embedding.provider`.
pub enum ConfiguredEmbedder {
    Fastembed(FastEmbedder),
    Hash(HashEmbedder),
}

impl ConfiguredEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        match config.provider {
            EmbeddingProvider::Fastembed => FastEmbedder::new(config).map(Self::Fastembed),
            EmbeddingProvider::Hash => Ok(Self::Hash(HashEmbedder::new(config.dimension))),
        }
    }
}

#[async_trait]
impl Embedder for ConfiguredEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            Self::Fastembed(e) => e.embed(text).await,
            Self::Hash(e) => e.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Self::Fastembed(e) => e.embed_batch(texts).await,
            Self::Hash(e) => e.embed_batch(texts).await,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Fastembed(e) => e.dimension(),
            Self::Hash(e) => e.dimension(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Self::Fastembed(e) => e.model_name(),
            Self::Hash(e) => e.model_name(),
        }
    }
}
