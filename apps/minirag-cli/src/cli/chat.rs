use anyhow::Result;
use minirag_core::{Runtime, SessionHistory};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::replies::{self, Command};

pub async fn run(runtime: &Runtime) -> Result<()> {
    runtime.index_on_start().await;

    let mut history = SessionHistory::new(runtime.config.session.history_turns);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", replies::HELP_TEXT);
    println!("Type a question, or /quit to leave.");

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "/quit" | "/exit") {
            break;
        }

        let command = Command::parse(input).unwrap_or_else(|| Command::Ask(input.to_string()));
        let reply = replies::handle(&*runtime.pipeline, &mut history, command).await;
        println!("{reply}\n");
    }
    Ok(())
}
