pub mod cache;
pub mod chunker;
pub mod indexer;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod synthesizer;

pub use cache::QueryCache;
pub use chunker::{Chunker, chunk_text};
pub use indexer::{IndexReport, Indexer};
pub use loader::load_documents;
pub use pipeline::RagPipeline;
pub use retriever::{Retriever, cosine_similarity};
pub use synthesizer::Synthesizer;
