use std::sync::Arc;

use crate::domain::{Chunk, ScoredChunk};
use crate::error::{RagError, Result};
use crate::ports::ChunkStore;

/// Brute-force top-k search over every stored chunk.
///
/// O(N·D) per query. An indexed nearest-neighbour structure can replace the
/// scan behind the same `retrieve` signature if the corpus grows.
pub struct Retriever<S>
where
    S: ChunkStore,
{
    store: Arc<S>,
}

impl<S> Retriever<S>
where
    S: ChunkStore,
{
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn retrieve(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(RagError::InvalidTopK);
        }
        let chunks = self.store.all_chunks().await?;
        rank(query, chunks, k)
    }
}

/// Scores `chunks` against `query`, best first. Ties keep the input order.
/// Zero-norm chunks are left out; a zero-norm query is an embedding failure.
pub fn rank(query: &[f32], chunks: Vec<Chunk>, k: usize) -> Result<Vec<ScoredChunk>> {
    if k == 0 {
        return Err(RagError::InvalidTopK);
    }
    let query_norm = norm(query);
    if query_norm == 0.0 {
        return Err(RagError::Embedding("query embedding has zero norm".into()));
    }

    let mut scored = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.embedding.len() != query.len() {
            return Err(RagError::DimensionMismatch {
                expected: query.len(),
                actual: chunk.embedding.len(),
            });
        }
        let chunk_norm = norm(&chunk.embedding);
        if chunk_norm == 0.0 {
            tracing::debug!(id = chunk.id, "skipping zero-norm chunk");
            continue;
        }
        let score = (dot(query, &chunk.embedding) / (query_norm * chunk_norm)).clamp(-1.0, 1.0);
        scored.push(ScoredChunk { chunk, score });
    }

    // Stable sort: equal scores stay in insertion order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    Ok(scored)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = norm(a);
    let norm_b = norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot(a, b) / (norm_a * norm_b)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteChunkStore;
    use crate::domain::NewChunk;
    use pretty_assertions::assert_eq;

    fn chunk(id: i64, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id,
            document: "doc.md".to_string(),
            index: usize::try_from(id).unwrap(),
            text: format!("chunk {id}"),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);

        assert!(cosine_similarity(&a, &[0.0, 0.0, 0.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let chunks = vec![
            chunk(0, vec![0.0, 1.0]),
            chunk(1, vec![1.0, 0.0]),
            chunk(2, vec![1.0, 1.0]),
            chunk(3, vec![-1.0, 0.0]),
        ];
        let results = rank(&[1.0, 0.0], chunks, 3).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let chunks = (0..5).map(|i| chunk(i, vec![2.0, 2.0])).collect();
        let ids: Vec<_> = rank(&[1.0, 1.0], chunks, 5)
            .unwrap()
            .iter()
            .map(|r| r.chunk.id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_k_larger_than_store_returns_everything() {
        let chunks = vec![chunk(0, vec![1.0, 0.0]), chunk(1, vec![0.0, 1.0])];
        assert_eq!(rank(&[1.0, 0.5], chunks, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_norm_chunks_are_excluded() {
        let chunks = vec![chunk(0, vec![0.0, 0.0]), chunk(1, vec![0.0, 1.0])];
        let results = rank(&[0.0, 1.0], chunks, 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, 1);
    }

    #[test]
    fn test_zero_query_is_rejected() {
        let err = rank(&[0.0, 0.0], vec![chunk(0, vec![1.0, 0.0])], 1).unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[test]
    fn test_zero_k_is_rejected() {
        assert!(matches!(
            rank(&[1.0], vec![], 0),
            Err(RagError::InvalidTopK)
        ));
    }

    #[test]
    fn test_scores_stay_in_range() {
        let chunks = vec![chunk(0, vec![3.0, 4.0]), chunk(1, vec![-3.0, -4.0])];
        for r in rank(&[3.0, 4.0], chunks, 2).unwrap() {
            assert!((-1.0..=1.0).contains(&r.score));
        }
    }

    #[tokio::test]
    async fn test_retrieve_reads_from_store() {
        let store = Arc::new(SqliteChunkStore::open_in_memory(2).unwrap());
        store
            .replace_all(
                vec![
                    NewChunk {
                        document: "a.md".into(),
                        index: 0,
                        text: "east".into(),
                        embedding: vec![1.0, 0.0],
                    },
                    NewChunk {
                        document: "a.md".into(),
                        index: 1,
                        text: "north".into(),
                        embedding: vec![0.0, 1.0],
                    },
                ],
                "fp",
            )
            .await
            .unwrap();

        let retriever = Retriever::new(store);
        let results = retriever.retrieve(&[0.1, 0.9], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "north");
    }
}
