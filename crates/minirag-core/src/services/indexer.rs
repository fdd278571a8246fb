use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::IndexConfig;
use crate::domain::{Document, NewChunk};
use crate::error::{RagError, Result};
use crate::ports::{ChunkStore, Embedder};
use crate::services::chunker::Chunker;
use crate::services::loader::load_documents;

const EMBED_BATCH: usize = 32;

/// Rebuilds the chunk store from the documents directory.
///
/// All chunking and embedding happens before the store is touched; the new
/// snapshot is then swapped in with a single `replace_all`. Any failure
/// leaves the previous snapshot in place.
pub struct Indexer<S, E>
where
    S: ChunkStore,
    E: Embedder,
{
    store: Arc<S>,
    embedder: Arc<E>,
    chunker: Chunker,
    docs_dir: PathBuf,
    extensions: Vec<String>,
    doc_header: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    /// The corpus was unchanged and the existing snapshot was kept.
    pub skipped: bool,
    pub fingerprint: String,
}

impl<S, E> Indexer<S, E>
where
    S: ChunkStore,
    E: Embedder,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>, config: &IndexConfig) -> Result<Self> {
        Ok(Self {
            store,
            embedder,
            chunker: Chunker::new(config.chunk_max_len)?,
            docs_dir: config.docs_dir.clone(),
            extensions: config.extensions.clone(),
            doc_header: config.doc_header,
        })
    }

    /// Re-reads the documents directory and rebuilds. Unless `force` is set,
    /// an unchanged corpus keeps the current snapshot.
    pub async fn rebuild(&self, force: bool) -> Result<IndexReport> {
        let documents = load_documents(&self.docs_dir, &self.extensions)?;
        if documents.is_empty() {
            tracing::warn!(dir = %self.docs_dir.display(), "no documents found to index");
        }
        self.rebuild_from(&documents, force).await
    }

    pub async fn rebuild_from(&self, documents: &[Document], force: bool) -> Result<IndexReport> {
        let fingerprint = self.fingerprint(documents);

        if !force && self.store.fingerprint().await?.as_deref() == Some(fingerprint.as_str()) {
            let chunks = self.store.count().await?;
            tracing::info!(documents = documents.len(), chunks, "index up to date");
            return Ok(IndexReport {
                documents: documents.len(),
                chunks,
                skipped: true,
                fingerprint,
            });
        }

        let mut pending = Vec::new();
        for document in documents {
            let name = document.name();
            let pieces = self.chunker.chunk(&document.content);
            tracing::info!("Indexing {name} with {} chunks...", pieces.len());

            for (index, text) in pieces.into_iter().enumerate() {
                pending.push((document.path.to_string_lossy().to_string(), name.clone(), index, text));
            }
        }

        let mut chunks = Vec::with_capacity(pending.len());
        for batch in pending.chunks(EMBED_BATCH) {
            let inputs: Vec<String> = batch
                .iter()
                .map(|(_, name, _, text)| self.embed_input(name, text))
                .collect();
            let vectors = self.embedder.embed_batch(&inputs).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            for ((document, _, index, text), embedding) in batch.iter().zip(vectors) {
                if embedding.len() != self.embedder.dimension() {
                    return Err(RagError::DimensionMismatch {
                        expected: self.embedder.dimension(),
                        actual: embedding.len(),
                    });
                }
                chunks.push(NewChunk {
                    document: document.clone(),
                    index: *index,
                    text: text.clone(),
                    embedding,
                });
            }
        }

        let count = chunks.len();
        self.store.replace_all(chunks, &fingerprint).await?;
        tracing::info!(documents = documents.len(), chunks = count, "Indexing done.");

        Ok(IndexReport {
            documents: documents.len(),
            chunks: count,
            skipped: false,
            fingerprint,
        })
    }

    fn embed_input(&self, name: &str, text: &str) -> String {
        if self.doc_header {
            format!("[DOC: {name}]\n{text}")
        } else {
            text.to_string()
        }
    }

    /// Identifies the corpus together with every setting that shapes its chunks.
    fn fingerprint(&self, documents: &[Document]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.embedder.model_name().as_bytes());
        hasher.update(&(self.embedder.dimension() as u64).to_le_bytes());
        hasher.update(&(self.chunker.max_len() as u64).to_le_bytes());
        hasher.update(&[u8::from(self.doc_header)]);
        for document in documents {
            hasher.update(document.path.to_string_lossy().as_bytes());
            hasher.update(b"\0");
            hasher.update(document.content_hash.as_bytes());
        }
        hex::encode(&hasher.finalize().as_bytes()[..16])
    }
}
