//! Wires the concrete adapters selected by [`Config`].

use std::sync::Arc;

use crate::adapters::{ConfiguredEmbedder, OpenAiClient, SqliteChunkStore};
use crate::config::Config;
use crate::error::Result;
use crate::services::{IndexReport, Indexer, RagPipeline};

pub type Pipeline = RagPipeline<SqliteChunkStore, ConfiguredEmbedder, OpenAiClient>;

pub struct Runtime {
    pub config: Config,
    pub store: Arc<SqliteChunkStore>,
    pub embedder: Arc<ConfiguredEmbedder>,
    pub indexer: Indexer<SqliteChunkStore, ConfiguredEmbedder>,
    pub pipeline: Arc<Pipeline>,
}

impl Runtime {
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(SqliteChunkStore::open(
            &config.storage.db_path,
            config.embedding.dimension,
        )?);
        let embedder = Arc::new(ConfiguredEmbedder::from_config(&config.embedding)?);
        let client = Arc::new(OpenAiClient::new(&config.llm)?);

        let indexer = Indexer::new(Arc::clone(&store), Arc::clone(&embedder), &config.index)?;
        let pipeline = Arc::new(RagPipeline::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            client,
            &config,
        ));

        Ok(Self {
            config,
            store,
            embedder,
            indexer,
            pipeline,
        })
    }

    /// Startup re-index. A failure is logged and the previous snapshot keeps
    /// serving queries.
    pub async fn index_on_start(&self) -> Option<IndexReport> {
        tracing::info!("Indexing documents...");
        match self.indexer.rebuild(false).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("indexing failed, serving previous index: {e}");
                None
            }
        }
    }
}
