use serde::{Deserialize, Serialize};

/// A chunk ready to be written by a store rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChunk {
    pub document: String,
    pub index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A chunk as persisted, with the row id assigned in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub document: String,
    pub index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}
