use anyhow::Result;
use minirag_core::Runtime;

pub async fn run(runtime: &Runtime, question: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    runtime.index_on_start().await;

    let k = top_k.unwrap_or_else(|| runtime.pipeline.top_k());
    let response = runtime.pipeline.run_with_k(question.trim(), k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.render());
    }
    Ok(())
}
