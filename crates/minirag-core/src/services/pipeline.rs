use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::domain::{Answer, RagResponse, ScoredChunk, SessionHistory, SourceRef};
use crate::error::{RagError, Result};
use crate::ports::{ChunkStore, CompletionClient, Embedder};
use crate::services::cache::QueryCache;
use crate::services::retriever::Retriever;
use crate::services::synthesizer::Synthesizer;

/// Query-time flow: cache, embedder on miss, retriever, synthesizer.
///
/// Shared across front ends behind an `Arc`; every call is scoped to its own
/// query and never mutates the store.
pub struct RagPipeline<S, E, C>
where
    S: ChunkStore,
    E: Embedder,
    C: CompletionClient,
{
    cache: QueryCache,
    embedder: Arc<E>,
    retriever: Retriever<S>,
    synthesizer: Synthesizer<C>,
    top_k: usize,
    llm_timeout: Duration,
}

impl<S, E, C> RagPipeline<S, E, C>
where
    S: ChunkStore,
    E: Embedder,
    C: CompletionClient,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>, client: Arc<C>, config: &Config) -> Self {
        Self {
            cache: QueryCache::new(config.cache.capacity),
            embedder,
            retriever: Retriever::new(store),
            synthesizer: Synthesizer::new(client),
            top_k: config.retrieval.top_k,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
        }
    }

    #[must_use]
    pub const fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn embed_query(&self, query: &str) -> Result<Arc<[f32]>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        let embedder = Arc::clone(&self.embedder);
        self.cache
            .get_or_compute(query, |q| async move { embedder.embed(&q).await })
            .await
    }

    /// Retrieval only, no language model call.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = self.embed_query(query).await?;
        self.retriever.retrieve(&vector, k).await
    }

    pub async fn run_rag_pipeline(&self, query: &str) -> Result<RagResponse> {
        self.run_with_k(query, self.top_k).await
    }

    /// Errors are retrieval failures. A failed language model call is not an
    /// error here: it comes back as [`Answer::Failed`] with the sources kept.
    pub async fn run_with_k(&self, query: &str, k: usize) -> Result<RagResponse> {
        let retrieved = self.search(query, k).await?;
        if retrieved.is_empty() {
            return Ok(RagResponse {
                query: query.to_string(),
                answer: Answer::NoDocuments,
                sources: Vec::new(),
            });
        }

        let sources = retrieved.iter().map(SourceRef::from_scored).collect();
        let answer = match self.with_timeout(self.synthesizer.synthesize(query, &retrieved)).await {
            Ok(text) => Answer::Generated { text },
            Err(e) => {
                tracing::warn!("answer generation failed: {e}");
                Answer::failed(&e)
            }
        };

        Ok(RagResponse {
            query: query.to_string(),
            answer,
            sources,
        })
    }

    /// Runs the pipeline and records the turn in the caller's session.
    pub async fn ask(&self, query: &str, session: &mut SessionHistory) -> Result<RagResponse> {
        let response = self.run_rag_pipeline(query).await?;
        if let Some(text) = response.answer.text() {
            session.record(query, text);
        }
        Ok(response)
    }

    pub async fn summarize(&self, session: &SessionHistory) -> Result<Option<String>> {
        if session.is_empty() {
            return Ok(None);
        }
        self.with_timeout(self.synthesizer.summarize(session))
            .await
            .map(Some)
    }

    async fn with_timeout<F>(&self, call: F) -> Result<String>
    where
        F: std::future::Future<Output = Result<String>>,
    {
        tokio::time::timeout(self.llm_timeout, call)
            .await
            .map_err(|_| RagError::LlmTimeout(self.llm_timeout.as_secs()))?
    }
}
