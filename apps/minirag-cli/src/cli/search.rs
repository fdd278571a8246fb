use anyhow::Result;
use minirag_core::{Runtime, SourceRef};

pub async fn run(runtime: &Runtime, query: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    runtime.index_on_start().await;

    let k = top_k.unwrap_or_else(|| runtime.pipeline.top_k());
    let results = runtime.pipeline.search(query.trim(), k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No chunks indexed.");
    }
    for scored in &results {
        println!("{}", SourceRef::from_scored(scored).line());
    }
    Ok(())
}
