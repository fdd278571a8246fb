use async_trait::async_trait;

use crate::domain::{Chunk, NewChunk};
use crate::error::Result;

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Atomically swap the stored snapshot for `chunks`, recording
    /// `fingerprint` alongside. Readers see either the old or new snapshot.
    async fn replace_all(&self, chunks: Vec<NewChunk>, fingerprint: &str) -> Result<()>;

    /// Every readable chunk in insertion order. Unreadable rows are skipped.
    async fn all_chunks(&self) -> Result<Vec<Chunk>>;

    async fn count(&self) -> Result<usize>;

    async fn fingerprint(&self) -> Result<Option<String>>;
}
