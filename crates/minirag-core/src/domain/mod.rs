pub mod chunk;
pub mod document;
pub mod search;
pub mod session;

pub use chunk::{Chunk, NewChunk};
pub use document::Document;
pub use search::{Answer, FailureKind, RagResponse, ScoredChunk, SourceRef};
pub use session::{SessionHistory, Turn};
