pub mod complete;
pub mod embed;
pub mod store;

pub use complete::{CompletionClient, Prompt};
pub use embed::Embedder;
pub use store::ChunkStore;
