use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use minirag_core::{Config, Runtime};

mod ask;
mod chat;
mod index;
mod search;
mod status;

#[derive(Parser)]
#[command(name = "minirag")]
#[command(about = "Ask questions over a local folder of notes")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to ./minirag.toml)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Output as JSON")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Chunk, embed and store the documents directory")]
    Index {
        #[arg(long, help = "Rebuild even when the corpus is unchanged")]
        force: bool,
    },

    #[command(about = "Answer one question from the indexed documents")]
    Ask {
        #[arg(help = "Question to answer")]
        question: String,

        #[arg(long, help = "Number of chunks used as context")]
        top_k: Option<usize>,
    },

    #[command(about = "Show the closest chunks without calling the language model")]
    Search {
        #[arg(help = "Search query")]
        query: String,

        #[arg(long, help = "Maximum results to return")]
        top_k: Option<usize>,
    },

    #[command(about = "Interactive question loop on stdin")]
    Chat,

    #[command(about = "Run the Telegram bot (long polling)")]
    Telegram,

    #[command(about = "Serve the browser form for local debugging")]
    Serve {
        #[arg(long, help = "Address to bind, e.g. 127.0.0.1:7860")]
        bind: Option<std::net::SocketAddr>,
    },

    #[command(about = "Show index statistics")]
    Status,
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        config.web.bind = *bind;
    }
    let runtime = Runtime::from_config(config)?;

    match cli.command {
        Commands::Index { force } => index::run(&runtime, force, cli.json).await,
        Commands::Ask { question, top_k } => ask::run(&runtime, &question, top_k, cli.json).await,
        Commands::Search { query, top_k } => search::run(&runtime, &query, top_k, cli.json).await,
        Commands::Chat => chat::run(&runtime).await,
        Commands::Telegram => crate::telegram::run(&runtime).await,
        Commands::Serve { .. } => crate::web::run(&runtime).await,
        Commands::Status => status::run(&runtime, cli.json).await,
    }
}
