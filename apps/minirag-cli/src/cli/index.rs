use anyhow::Result;
use minirag_core::Runtime;

pub async fn run(runtime: &Runtime, force: bool, json: bool) -> Result<()> {
    let report = runtime.indexer.rebuild(force).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.skipped {
        println!(
            "Index up to date: {} documents, {} chunks",
            report.documents, report.chunks
        );
    } else {
        println!(
            "Indexed {} documents into {} chunks",
            report.documents, report.chunks
        );
    }
    Ok(())
}
