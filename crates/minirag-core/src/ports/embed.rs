use async_trait::async_trait;

use crate::error::Result;

/// Maps text to a fixed-length vector. Implementations must be deterministic
/// for fixed model weights, and `embed_batch` must agree element-wise with
/// calling `embed` on each text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}
