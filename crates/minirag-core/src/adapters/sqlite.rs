//! Single-file SQLite chunk store.
//!
//! Embeddings are kept as JSON arrays of floats in `embedding_json`. The
//! connection lives behind a mutex: a rebuild holds it for the length of one
//! transaction, so concurrent readers either wait or read the previous
//! committed snapshot, never a half-written one.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::{Chunk, NewChunk};
use crate::error::{RagError, Result};
use crate::ports::ChunkStore;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_path TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    chunk_text TEXT NOT NULL,
    embedding_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const FINGERPRINT_KEY: &str = "corpus_fingerprint";

pub struct SqliteChunkStore {
    conn: Mutex<Connection>,
    dimension: usize,
}

impl SqliteChunkStore {
    pub fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?, dimension)
    }

    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, dimension)
    }

    fn init(conn: Connection, dimension: usize) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            dimension,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RagError::Io(std::io::Error::other("chunk store lock poisoned")))
    }

    fn decode_row(&self, row: RawRow) -> Result<Chunk> {
        let id = row.id;
        let corrupt = move |reason: String| RagError::CorruptChunk { id, reason };

        let embedding: Vec<f32> = serde_json::from_str(&row.embedding_json)
            .map_err(|e| corrupt(format!("unreadable embedding: {e}")))?;
        if embedding.len() != self.dimension {
            return Err(corrupt(format!(
                "embedding has {} values, expected {}",
                embedding.len(),
                self.dimension
            )));
        }
        let index = usize::try_from(row.chunk_index)
            .map_err(|_| corrupt(format!("negative chunk index {}", row.chunk_index)))?;

        Ok(Chunk {
            id: row.id,
            document: row.document_path,
            index,
            text: row.chunk_text,
            embedding,
        })
    }

    #[cfg(test)]
    fn insert_raw(&self, document: &str, index: i64, text: &str, embedding_json: &str) {
        self.lock()
            .unwrap()
            .execute(
                "INSERT INTO chunks (document_path, chunk_index, chunk_text, embedding_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![document, index, text, embedding_json],
            )
            .unwrap();
    }
}

struct RawRow {
    id: i64,
    document_path: String,
    chunk_index: i64,
    chunk_text: String,
    embedding_json: String,
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn replace_all(&self, chunks: Vec<NewChunk>, fingerprint: &str) -> Result<()> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.embedding.len(),
            });
        }
        let encoded = chunks
            .iter()
            .map(|c| serde_json::to_string(&c.embedding))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (document_path, chunk_index, chunk_text, embedding_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (chunk, embedding_json) in chunks.iter().zip(&encoded) {
                let index = i64::try_from(chunk.index)
                    .map_err(|_| RagError::Config(format!("chunk index {} too large", chunk.index)))?;
                stmt.execute(params![chunk.document, index, chunk.text, embedding_json])?;
            }
        }
        tx.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![FINGERPRINT_KEY, fingerprint],
        )?;
        tx.commit()?;

        tracing::debug!(chunks = chunks.len(), "chunk store snapshot replaced");
        Ok(())
    }

    async fn all_chunks(&self) -> Result<Vec<Chunk>> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, document_path, chunk_index, chunk_text, embedding_json
                 FROM chunks ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(RawRow {
                        id: row.get(0)?,
                        document_path: row.get(1)?,
                        chunk_index: row.get(2)?,
                        chunk_text: row.get(3)?,
                        embedding_json: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            match self.decode_row(row) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => tracing::warn!("skipping chunk: {e}"),
            }
        }
        Ok(chunks)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    async fn fingerprint(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![FINGERPRINT_KEY],
                |r| r.get(0),
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::retriever::cosine_similarity;
    use pretty_assertions::assert_eq;

    fn new_chunk(document: &str, index: usize, text: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            document: document.to_string(),
            index,
            text: text.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_replace_and_read_back_in_order() {
        let store = SqliteChunkStore::open_in_memory(3).unwrap();
        store
            .replace_all(
                vec![
                    new_chunk("a.md", 0, "first", vec![1.0, 0.0, 0.0]),
                    new_chunk("a.md", 1, "second", vec![0.0, 1.0, 0.0]),
                ],
                "fp-1",
            )
            .await
            .unwrap();

        let chunks = store.all_chunks().await.unwrap();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.fingerprint().await.unwrap().as_deref(), Some("fp-1"));
    }

    #[tokio::test]
    async fn test_embedding_round_trips() {
        let original = vec![0.123_456_79_f32, -0.987_654_3, 1e-7, 0.333_333_34];
        let store = SqliteChunkStore::open_in_memory(original.len()).unwrap();
        store
            .replace_all(vec![new_chunk("a.md", 0, "t", original.clone())], "fp")
            .await
            .unwrap();

        let loaded = &store.all_chunks().await.unwrap()[0].embedding;
        assert_eq!(loaded.len(), original.len());
        assert!(cosine_similarity(&original, loaded) >= 0.9999);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_snapshot() {
        let store = SqliteChunkStore::open_in_memory(2).unwrap();
        store
            .replace_all(vec![new_chunk("old.md", 0, "old", vec![1.0, 0.0])], "fp-old")
            .await
            .unwrap();
        store
            .replace_all(vec![new_chunk("new.md", 0, "new", vec![0.0, 1.0])], "fp-new")
            .await
            .unwrap();

        let chunks = store.all_chunks().await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document, "new.md");
        assert_eq!(store.fingerprint().await.unwrap().as_deref(), Some("fp-new"));
    }

    #[tokio::test]
    async fn test_wrong_dimension_aborts_without_touching_snapshot() {
        let store = SqliteChunkStore::open_in_memory(2).unwrap();
        store
            .replace_all(vec![new_chunk("keep.md", 0, "keep", vec![1.0, 0.0])], "fp")
            .await
            .unwrap();

        let err = store
            .replace_all(vec![new_chunk("bad.md", 0, "bad", vec![1.0])], "fp-2")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1 }));
        assert_eq!(store.all_chunks().await.unwrap()[0].text, "keep");
        assert_eq!(store.fingerprint().await.unwrap().as_deref(), Some("fp"));
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped() {
        let store = SqliteChunkStore::open_in_memory(2).unwrap();
        store.insert_raw("a.md", 0, "good", "[0.5, 0.5]");
        store.insert_raw("a.md", 1, "garbage", "not json");
        store.insert_raw("a.md", 2, "short", "[1.0]");
        store.insert_raw("a.md", -1, "negative", "[1.0, 0.0]");

        let chunks = store.all_chunks().await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "good");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.sqlite");
        {
            let store = SqliteChunkStore::open(&path, 2).unwrap();
            store
                .replace_all(vec![new_chunk("a.md", 0, "kept", vec![0.6, 0.8])], "fp")
                .await
                .unwrap();
        }
        let reopened = SqliteChunkStore::open(&path, 2).unwrap();
        let chunks = reopened.all_chunks().await.unwrap();
        assert_eq!(chunks[0].text, "kept");
        assert_eq!(chunks[0].embedding, vec![0.6, 0.8]);
    }
}
