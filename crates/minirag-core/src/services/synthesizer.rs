use std::fmt::Write as _;
use std::sync::Arc;

use crate::domain::{ScoredChunk, SessionHistory};
use crate::error::Result;
use crate::ports::{CompletionClient, Prompt};

const GROUNDED_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question using ONLY the given context. \
     If the answer is not in the context, say you don't know.";

const SUMMARY_QUESTION: &str =
    "Please provide a short, clear summary (2-3 sentences) of the conversation above.";

/// Turns retrieved chunks into a grounded prompt and asks the language model.
pub struct Synthesizer<C>
where
    C: CompletionClient,
{
    client: Arc<C>,
}

impl<C> Synthesizer<C>
where
    C: CompletionClient,
{
    pub const fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn synthesize(&self, query: &str, retrieved: &[ScoredChunk]) -> Result<String> {
        let prompt = grounded_prompt(&context_block(retrieved), query);
        self.client.complete(&prompt).await
    }

    pub async fn summarize(&self, history: &SessionHistory) -> Result<String> {
        let prompt = grounded_prompt(&history.render(), SUMMARY_QUESTION);
        self.client.complete(&prompt).await
    }
}

pub fn context_block(retrieved: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for scored in retrieved {
        let _ = write!(
            context,
            "[From {}, score={:.3}]\n{}\n\n",
            scored.document_name(),
            scored.score,
            scored.chunk.text
        );
    }
    context
}

fn grounded_prompt(context: &str, question: &str) -> Prompt {
    Prompt {
        system: GROUNDED_SYSTEM_PROMPT.to_string(),
        user: format!("Context:\n{context}\n\nQuestion: {question}"),
    }
}
