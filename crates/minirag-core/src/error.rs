use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("top-k must be a positive integer")]
    InvalidTopK,

    #[error("Documents directory not found: {}", .0.display())]
    DocumentsDirMissing(PathBuf),

    #[error("Cannot read document {}: {source}", path.display())]
    DocumentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt chunk {id}: {reason}")]
    CorruptChunk { id: i64, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Language model did not answer within {0} seconds")]
    LlmTimeout(u64),

    #[error("Language model rate limited the request")]
    LlmRateLimited,

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RagError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyQuery
            | Self::InvalidTopK
            | Self::DocumentsDirMissing(_)
            | Self::DocumentUnreadable { .. } => 1,
            Self::Embedding(_) | Self::DimensionMismatch { .. } => 2,
            Self::CorruptChunk { .. } | Self::Store(_) => 3,
            Self::Llm(_) | Self::LlmTimeout(_) | Self::LlmRateLimited => 4,
            Self::MissingCredential(_) | Self::Config(_) => 5,
            Self::Io(_) | Self::Serialization(_) | Self::Http(_) => 10,
        }
    }

    /// Errors caused by what the caller supplied rather than by the system.
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery
                | Self::InvalidTopK
                | Self::DocumentsDirMissing(_)
                | Self::DocumentUnreadable { .. }
        )
    }

    /// Failures the caller may retry as-is; nothing in the core retries them.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LlmTimeout(_) | Self::LlmRateLimited)
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
