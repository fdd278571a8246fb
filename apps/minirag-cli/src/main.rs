use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod replies;
mod telegram;
mod web;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "minirag=debug,minirag_core=debug"
    } else {
        "minirag=info,minirag_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<minirag_core::RagError>()
            .map_or(1, minirag_core::RagError::exit_code);
        std::process::exit(code);
    }
}
