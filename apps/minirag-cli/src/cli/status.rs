use anyhow::Result;
use minirag_core::Runtime;
use minirag_core::ports::{ChunkStore, Embedder};
use serde::Serialize;

#[derive(Serialize)]
struct Status {
    db_path: String,
    docs_dir: String,
    chunks: usize,
    fingerprint: Option<String>,
    embedding_model: String,
    dimension: usize,
}

pub async fn run(runtime: &Runtime, json: bool) -> Result<()> {
    let status = Status {
        db_path: runtime.config.storage.db_path.display().to_string(),
        docs_dir: runtime.config.index.docs_dir.display().to_string(),
        chunks: runtime.store.count().await?,
        fingerprint: runtime.store.fingerprint().await?,
        embedding_model: runtime.embedder.model_name().to_string(),
        dimension: runtime.embedder.dimension(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Database:    {}", status.db_path);
    println!("Documents:   {}", status.docs_dir);
    println!("Chunks:      {}", status.chunks);
    println!(
        "Fingerprint: {}",
        status.fingerprint.as_deref().unwrap_or("(never indexed)")
    );
    println!("Embedding:   {} ({}d)", status.embedding_model, status.dimension);
    Ok(())
}
