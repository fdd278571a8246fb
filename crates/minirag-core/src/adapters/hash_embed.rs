//! Offline embedder based on feature hashing.
//!
//! Every lowercase alphanumeric token is hashed with blake3 into one of
//! `dimension` buckets and the resulting count vector is L2-normalized.
//! Texts that share words point in similar directions, which is enough for
//! small corpora, air-gapped runs and tests.

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::ports::Embedder;

pub struct HashEmbedder {
    dimension: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            name: format!("hash-{}", dimension.max(1)),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::Embedding("cannot embed empty text".into()));
        }

        let mut vector = vec![0.0_f32; self.dimension];
        let mut tokens = tokens(text).peekable();
        if tokens.peek().is_some() {
            for token in tokens {
                vector[self.bucket(&token)] += 1.0;
            }
        } else {
            // Punctuation-only input: fall back to hashing characters.
            for c in text.chars().filter(|c| !c.is_whitespace()) {
                vector[self.bucket(&c.to_string())] += 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut vector {
            *x /= norm;
        }
        Ok(vector)
    }

    #[allow(clippy::cast_possible_truncation)] // bucket index is reduced modulo the dimension
    fn bucket(&self, token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut bytes = [0_u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_sync(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_sync(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::retriever::cosine_similarity;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let embedder = HashEmbedder::new(384);
        let a = embedder.embed("The sky is blue.").await.unwrap();
        let b = embedder.embed("The sky is blue.").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashEmbedder::new(64);
        let texts = vec!["alpha beta".to_string(), "gamma".to_string(), "?!".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&embedder.embed(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_unit_norm_for_non_empty_input() {
        let embedder = HashEmbedder::new(32);
        for text in ["word", "...", "Mixed CASE words"] {
            let v = embedder.embed(text).await.unwrap();
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5, "{text}: {norm}");
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_an_error() {
        let embedder = HashEmbedder::new(32);
        assert!(matches!(
            embedder.embed("   ").await,
            Err(RagError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let embedder = HashEmbedder::new(384);
        let query = embedder.embed("What color is the sky?").await.unwrap();
        let sky = embedder.embed("The sky is blue.").await.unwrap();
        let grass = embedder.embed("The grass is green.").await.unwrap();
        assert!(cosine_similarity(&query, &sky) > cosine_similarity(&query, &grass));
    }
}
