//! Browser form for debugging retrieval locally.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use minirag_core::ports::{ChunkStore, CompletionClient, Embedder};
use minirag_core::services::RagPipeline;
use minirag_core::{Pipeline, RagResponse, Runtime, SessionHistory};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::replies::{self, Command};

const PAGE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Local RAG Debugger</title>
<style>
body { font-family: sans-serif; max-width: 52rem; margin: 2rem auto; }
textarea { width: 100%; }
pre { background: #f4f4f4; padding: .75rem; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>Local RAG Debugger</h1>
<p>Ask questions over the same docs and pipeline used by the Telegram bot.<br>
Useful for local testing and debugging.</p>
<form id="ask">
<textarea name="question" rows="2" placeholder="Ask something about your docs..."></textarea>
<button type="submit">Submit</button>
</form>
<h3>Answer</h3><pre id="answer"></pre>
<h3>Context &amp; sources (for debugging)</h3><pre id="sources"></pre>
<script>
document.getElementById("ask").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const question = ev.target.question.value;
  document.getElementById("answer").textContent = "Thinking...";
  const res = await fetch("/api/ask", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ question }),
  });
  const body = await res.json();
  document.getElementById("answer").textContent = body.answer;
  document.getElementById("sources").textContent = body.sources;
});
</script>
</body>
</html>
"#;

const WEB_IMAGE_TEXT: &str = "This bot is running the Mini-RAG (text) variant.\n\
Image mode is not enabled here; I only handle text questions over the stored documents.";

struct AppState {
    pipeline: Arc<Pipeline>,
    history: Mutex<SessionHistory>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct AskReply {
    answer: String,
    sources: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<RagResponse>,
}

impl AskReply {
    fn local(answer: impl Into<String>, sources: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: sources.into(),
            response: None,
        }
    }
}

pub async fn run(runtime: &Runtime) -> Result<()> {
    tracing::info!("Indexing documents for the browser form...");
    runtime.index_on_start().await;

    let state = Arc::new(AppState {
        pipeline: Arc::clone(&runtime.pipeline),
        history: Mutex::new(SessionHistory::new(runtime.config.session.history_turns)),
    });
    let app = Router::new()
        .route("/", get(page))
        .route("/api/ask", post(ask))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(runtime.config.web.bind).await?;
    tracing::info!("Serving on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn page() -> Html<&'static str> {
    Html(PAGE)
}

async fn ask(State(state): State<Arc<AppState>>, Json(request): Json<AskRequest>) -> Json<AskReply> {
    let mut history = state.history.lock().await.clone();
    let reply = answer_form(&*state.pipeline, &mut history, &request.question).await;
    *state.history.lock().await = history;
    Json(reply)
}

async fn answer_form<S, E, C>(
    pipeline: &RagPipeline<S, E, C>,
    history: &mut SessionHistory,
    question: &str,
) -> AskReply
where
    S: ChunkStore,
    E: Embedder,
    C: CompletionClient,
{
    let question = question.trim();
    if question.is_empty() {
        return AskReply::local("Please enter a question.", "");
    }
    if question.eq_ignore_ascii_case("image") {
        return AskReply::local(WEB_IMAGE_TEXT, "Image mode disabled in this variant.");
    }

    let question = match Command::parse(question) {
        None => question.to_string(),
        Some(Command::Ask(q)) if !q.is_empty() => q,
        Some(Command::Help) => {
            return AskReply::local(replies::HELP_TEXT, "Local help message — no retrieval done.");
        }
        Some(Command::Image) => {
            return AskReply::local(WEB_IMAGE_TEXT, "Image mode disabled in this variant.");
        }
        Some(other) => {
            let answer = replies::handle(pipeline, history, other).await;
            return AskReply::local(answer, "");
        }
    };

    match pipeline.ask(&question, history).await {
        Ok(response) => AskReply {
            answer: response.answer.display(),
            sources: replies::sources_panel(&response),
            response: Some(response),
        },
        Err(e) => {
            tracing::error!("query failed: {e}");
            AskReply::local(format!("Error: {e}"), "")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use minirag_core::Config;
    use minirag_core::adapters::{HashEmbedder, SqliteChunkStore};
    use minirag_core::ports::Prompt;
    use pretty_assertions::assert_eq;

    struct FixedClient;

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, _prompt: &Prompt) -> minirag_core::Result<String> {
            Ok("Blue.".to_string())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn empty_pipeline() -> RagPipeline<SqliteChunkStore, HashEmbedder, FixedClient> {
        RagPipeline::new(
            Arc::new(SqliteChunkStore::open_in_memory(32).unwrap()),
            Arc::new(HashEmbedder::new(32)),
            Arc::new(FixedClient),
            &Config::default(),
        )
    }

    #[tokio::test]
    async fn test_local_commands_skip_retrieval() {
        let pipeline = empty_pipeline();
        let mut history = SessionHistory::new(3);

        let reply = answer_form(&pipeline, &mut history, "   ").await;
        assert_eq!(reply.answer, "Please enter a question.");

        let reply = answer_form(&pipeline, &mut history, "/start").await;
        assert_eq!(reply.answer, replies::HELP_TEXT);
        assert_eq!(reply.sources, "Local help message — no retrieval done.");

        let reply = answer_form(&pipeline, &mut history, "IMAGE").await;
        assert_eq!(reply.sources, "Image mode disabled in this variant.");
        assert!(reply.response.is_none());
    }

    #[tokio::test]
    async fn test_empty_index_reports_no_documents() {
        let pipeline = empty_pipeline();
        let mut history = SessionHistory::new(3);

        let reply = answer_form(&pipeline, &mut history, "What color is the sky?").await;
        assert_eq!(reply.answer, "I have no documents indexed yet. Check your docs/ folder.");
        assert_eq!(reply.sources, "No sources (no documents indexed yet).");
        assert!(history.is_empty());
    }
}
