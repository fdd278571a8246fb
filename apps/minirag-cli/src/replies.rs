//! Command handling shared by the chat, Telegram and browser front ends.

use minirag_core::ports::{ChunkStore, CompletionClient, Embedder};
use minirag_core::services::RagPipeline;
use minirag_core::{RagResponse, SessionHistory};

pub const HELP_TEXT: &str = "Hi! I am a simple RAG bot.\n\n\
Commands:\n\
/ask <your question> - Ask me something about the docs.\n\
/image - (Not enabled in this variant, I only handle text.)\n\
/help - Show this message.\n\
/summarize - Summarize your recent interactions.\n";

pub const IMAGE_TEXT: &str = "This bot is running the Mini-RAG (text) variant.\n\
Image mode is not enabled; I only handle text questions over the docs.";

pub const ASK_USAGE: &str = "Usage: /ask <your question>";

pub const NOTHING_TO_SUMMARIZE: &str = "I don't have any recent interactions to summarize yet.\n\
Ask me something first using /ask, then try /summarize.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Ask(String),
    Image,
    Summarize,
    Unknown(String),
}

impl Command {
    /// Parses a slash command. `/ask@my_bot question` is accepted as Telegram
    /// sends it in group chats. Returns `None` for plain text.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let rest = input.strip_prefix('/')?;
        let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        Some(match name.as_str() {
            "start" | "help" => Self::Help,
            "ask" => Self::Ask(args.trim().to_string()),
            "image" => Self::Image,
            "summarize" => Self::Summarize,
            _ => Self::Unknown(name),
        })
    }
}

/// Runs one command against the pipeline and returns the reply text.
/// Successful answers are recorded in `session`.
pub async fn handle<S, E, C>(
    pipeline: &RagPipeline<S, E, C>,
    session: &mut SessionHistory,
    command: Command,
) -> String
where
    S: ChunkStore,
    E: Embedder,
    C: CompletionClient,
{
    match command {
        Command::Help => HELP_TEXT.to_string(),
        Command::Image => IMAGE_TEXT.to_string(),
        Command::Unknown(name) => format!("Unknown command /{name}.\n\n{HELP_TEXT}"),
        Command::Ask(question) if question.is_empty() => ASK_USAGE.to_string(),
        Command::Ask(question) => match pipeline.ask(&question, session).await {
            Ok(response) => response.render(),
            Err(e) if e.is_input_error() => format!("Error: {e}"),
            Err(e) => {
                tracing::error!("query failed: {e}");
                "Error retrieving from the docs. Check server logs.".to_string()
            }
        },
        Command::Summarize => match pipeline.summarize(session).await {
            Ok(Some(summary)) => format!("Summary of your recent interactions:\n{summary}"),
            Ok(None) => NOTHING_TO_SUMMARIZE.to_string(),
            Err(e) => {
                tracing::error!("summarize failed: {e}");
                "Error summarizing the conversation.".to_string()
            }
        },
    }
}

/// Sources block for the browser form's debugging panel.
pub fn sources_panel(response: &RagResponse) -> String {
    if response.sources.is_empty() {
        "No sources (no documents indexed yet).".to_string()
    } else {
        format!("Sources used:\n{}", response.source_lines().join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use minirag_core::Config;
    use minirag_core::adapters::{HashEmbedder, SqliteChunkStore};
    use minirag_core::domain::Document;
    use minirag_core::ports::Prompt;
    use minirag_core::services::Indexer;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct EchoClient;

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(&self, prompt: &Prompt) -> minirag_core::Result<String> {
            Ok(format!("echo {}", prompt.user.len()))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    async fn pipeline() -> RagPipeline<SqliteChunkStore, HashEmbedder, EchoClient> {
        let store = Arc::new(SqliteChunkStore::open_in_memory(64).unwrap());
        let embedder = Arc::new(HashEmbedder::new(64));
        let config = Config::default();
        Indexer::new(Arc::clone(&store), Arc::clone(&embedder), &config.index)
            .unwrap()
            .rebuild_from(&[Document::new("sky.md", "The sky is blue.".into())], false)
            .await
            .unwrap();
        RagPipeline::new(store, embedder, Arc::new(EchoClient), &config)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Help));
        assert_eq!(Command::parse(" /HELP "), Some(Command::Help));
        assert_eq!(
            Command::parse("/ask@mini_bot what is blue?"),
            Some(Command::Ask("what is blue?".into()))
        );
        assert_eq!(Command::parse("/ask"), Some(Command::Ask(String::new())));
        assert_eq!(Command::parse("/summarize"), Some(Command::Summarize));
        assert_eq!(Command::parse("/dance"), Some(Command::Unknown("dance".into())));
        assert_eq!(Command::parse("plain question"), None);
    }

    #[test]
    fn test_help_lists_public_commands() {
        for command in ["/ask", "/image", "/help", "/summarize"] {
            assert!(HELP_TEXT.contains(command));
        }
        assert!(!HELP_TEXT.contains("/start"));
    }

    #[tokio::test]
    async fn test_ask_without_question_shows_usage() {
        let pipeline = pipeline().await;
        let mut session = SessionHistory::new(3);
        let reply = handle(&pipeline, &mut session, Command::Ask(String::new())).await;
        assert_eq!(reply, ASK_USAGE);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_ask_then_summarize() {
        let pipeline = pipeline().await;
        let mut session = SessionHistory::new(3);

        let summary = handle(&pipeline, &mut session, Command::Summarize).await;
        assert_eq!(summary, NOTHING_TO_SUMMARIZE);

        let reply = handle(&pipeline, &mut session, Command::Ask("What color is the sky?".into())).await;
        assert!(reply.starts_with("Answer:\necho "));
        assert!(reply.contains("Sources used:\n- sky.md (score="));
        assert_eq!(session.len(), 1);

        let summary = handle(&pipeline, &mut session, Command::Summarize).await;
        assert!(summary.starts_with("Summary of your recent interactions:\necho "));
    }
}
