use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Chunk;
use super::document::file_name;
use crate::error::RagError;

const SNIPPET_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

impl ScoredChunk {
    pub fn document_name(&self) -> String {
        file_name(Path::new(&self.chunk.document))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document: String,
    pub chunk_index: usize,
    pub score: f32,
    pub snippet: String,
}

impl SourceRef {
    pub fn from_scored(scored: &ScoredChunk) -> Self {
        Self {
            document: scored.document_name(),
            chunk_index: scored.chunk.index,
            score: scored.score,
            snippet: snippet(&scored.chunk.text),
        }
    }

    pub fn line(&self) -> String {
        format!(
            "- {} (score={:.3}) → \"{}\"",
            self.document, self.score, self.snippet
        )
    }
}

fn snippet(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > SNIPPET_CHARS {
        let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Answer {
    Generated { text: String },
    /// Retrieval succeeded but the language model did not produce an answer.
    Failed {
        kind: FailureKind,
        reason: String,
        retryable: bool,
    },
    NoDocuments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    RateLimited,
    Unavailable,
}

impl FailureKind {
    pub const fn of(error: &RagError) -> Self {
        match error {
            RagError::LlmTimeout(_) => Self::Timeout,
            RagError::LlmRateLimited => Self::RateLimited,
            _ => Self::Unavailable,
        }
    }
}

impl Answer {
    /// Answer-generation failure for `error`, keeping its message.
    pub fn failed(error: &RagError) -> Self {
        Self::Failed {
            kind: FailureKind::of(error),
            reason: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Generated { text } => Some(text),
            Self::Failed { .. } | Self::NoDocuments => None,
        }
    }

    /// What a front end shows in place of the answer.
    pub fn display(&self) -> String {
        match self {
            Self::Generated { text } => text.clone(),
            Self::Failed { kind, .. } => match kind {
                FailureKind::Timeout => "The language model did not answer in time. Please try again.",
                FailureKind::RateLimited => {
                    "The language model is busy (rate limited). Please try again shortly."
                }
                FailureKind::Unavailable => "Error calling the language model. Check server logs/config.",
            }
            .to_string(),
            Self::NoDocuments => "I have no documents indexed yet. Check your docs/ folder.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub query: String,
    pub answer: Answer,
    pub sources: Vec<SourceRef>,
}

impl RagResponse {
    pub fn source_lines(&self) -> Vec<String> {
        self.sources.iter().map(SourceRef::line).collect()
    }

    /// Answer followed by the sources block, as sent to chat front ends.
    pub fn render(&self) -> String {
        let mut out = format!("Answer:\n{}", self.answer.display());
        if !self.sources.is_empty() {
            out.push_str("\n\nSources used:");
            for line in self.source_lines() {
                let _ = write!(out, "\n{line}");
            }
        }
        out
    }
}
