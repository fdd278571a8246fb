//! Retrieval core for answering questions over a local folder of notes.
//!
//! Documents are chunked, embedded and stored in a single SQLite file. At
//! query time the query embedding is cached, every stored chunk is scored by
//! cosine similarity, and the top matches ground a language model answer.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod runtime;
pub mod services;

pub use config::Config;
pub use domain::{Answer, RagResponse, ScoredChunk, SessionHistory, SourceRef};
pub use error::{RagError, Result};
pub use runtime::{Pipeline, Runtime};
