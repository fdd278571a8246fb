//! Sentence-embedding model backed by fastembed (ONNX runtime).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};
use crate::ports::Embedder;

pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Loads the model, downloading weights into the cache dir on first use.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_id = resolve_model(&config.model)?;

        let mut options = InitOptions::new(model_id).with_show_download_progress(false);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(PathBuf::from(dir));
        }

        tracing::info!(model = %config.model, "loading embedding model");
        let model = TextEmbedding::try_new(options)
            .map_err(|e| RagError::Embedding(format!("failed to load {}: {e}", config.model)))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: config.model.clone(),
            dimension: config.dimension,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(RagError::Embedding("cannot embed empty text".into()));
        }

        let model = Arc::clone(&self.model);
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| RagError::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if vectors.len() != expected {
            return Err(RagError::Embedding(format!(
                "model returned {} vectors for {expected} texts",
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    let short = name.rsplit('/').next().unwrap_or(name).to_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        _ => Err(RagError::Config(format!("unsupported embedding model: {name}"))),
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.run(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("model returned no vector".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.to_vec()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_accepts_hub_prefix() {
        assert!(matches!(
            resolve_model("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            resolve_model("BAAI/bge-small-en-v1.5"),
            Ok(EmbeddingModel::BGESmallENV15)
        ));
    }

    #[test]
    fn test_resolve_model_rejects_unknown() {
        assert!(matches!(resolve_model("gpt-2"), Err(RagError::Config(_))));
    }
}
