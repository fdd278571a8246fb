//! Memoizes query embeddings keyed by the exact query string.
//!
//! Backed by a moka cache with least-recently-used eviction. Concurrent misses
//! for the same key are coalesced into a single embedding call, and values
//! are only published once fully computed.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::error::{RagError, Result};

#[derive(Debug, Clone)]
pub struct CachedEmbedding {
    pub vector: Arc<[f32]>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QueryCache {
    inner: Cache<String, CachedEmbedding>,
}

impl QueryCache {
    /// `capacity == 0` disables eviction.
    pub fn new(capacity: u64) -> Self {
        let builder = Cache::builder().eviction_policy(EvictionPolicy::lru());
        let inner = if capacity == 0 {
            builder.build()
        } else {
            builder.max_capacity(capacity).build()
        };
        Self { inner }
    }

    /// Returns the cached vector for `query`, or runs `embed` once and caches
    /// its result. Errors are returned to the caller and never cached.
    pub async fn get_or_compute<F, Fut>(&self, query: &str, embed: F) -> Result<Arc<[f32]>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Vec<f32>>>,
    {
        if let Some(hit) = self.inner.get(query).await {
            tracing::debug!(query, "query embedding cache hit");
            return Ok(hit.vector);
        }

        tracing::debug!(query, "query embedding cache miss");
        let init = async {
            let vector = embed(query.to_string()).await?;
            Ok::<_, RagError>(CachedEmbedding {
                vector: Arc::from(vector),
                created_at: Utc::now(),
            })
        };

        self.inner
            .try_get_with(query.to_string(), init)
            .await
            .map(|entry| entry.vector)
            .map_err(|e| match e.as_ref() {
                RagError::DimensionMismatch { expected, actual } => RagError::DimensionMismatch {
                    expected: *expected,
                    actual: *actual,
                },
                RagError::Embedding(msg) => RagError::Embedding(msg.clone()),
                other => RagError::Embedding(other.to_string()),
            })
    }

    #[cfg(test)]
    async fn get(&self, query: &str) -> Option<CachedEmbedding> {
        self.inner.get(query).await
    }

    /// Approximate; pending maintenance is flushed first.
    #[cfg(test)]
    async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_embed(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce(String) -> std::future::Ready<Result<Vec<f32>>> {
        let calls = Arc::clone(calls);
        move |_query: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(vec![0.6, 0.8]))
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits() {
        let cache = QueryCache::new(10);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.get_or_compute("sky?", counting_embed(&calls)).await.unwrap();
        let second = cache.get_or_compute("sky?", counting_embed(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(cache.get("sky?").await.is_some());
    }

    #[tokio::test]
    async fn test_keys_are_exact() {
        let cache = QueryCache::new(10);
        let calls = Arc::new(AtomicUsize::new(0));

        for query in ["Sky", "sky", " sky", "sky "] {
            cache.get_or_compute(query, counting_embed(&calls)).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = QueryCache::new(10);
        let err = cache
            .get_or_compute("q", |_| async { Err(RagError::Embedding("model offline".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(msg) if msg.contains("model offline")));

        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_or_compute("q", counting_embed(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_bounds_entries() {
        let cache = QueryCache::new(2);
        let calls = Arc::new(AtomicUsize::new(0));
        for query in ["a", "b", "c", "d"] {
            cache.get_or_compute(query, counting_embed(&calls)).await.unwrap();
        }
        assert!(cache.len().await <= 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_embed_once() {
        let cache = QueryCache::new(10);
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_compute("same", move |_| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            Ok(vec![0.5, 0.5])
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(&*task.await.unwrap().unwrap(), &[0.5, 0.5]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
