//! Domain types shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

pub type ChunkId = u64;

/// A retrievable unit of document text.
///
/// Ids are assigned by the vector index at append time, not by the
/// ingestor. A chunk never spans more than one source page, and is
/// immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub page: u32,
    pub content: String,
}

/// Ingestor output: a chunk that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct PageChunk {
    pub doc_id: String,
    pub page: u32,
    pub content: String,
}

/// A search hit. Higher score means more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Reference to a retrieved chunk, carried by a `sources` event and by
/// blocking answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub page: u32,
}

impl From<&Chunk> for SourceRef {
    fn from(chunk: &Chunk) -> Self {
        Self { chunk_id: chunk.id, doc_id: chunk.doc_id.clone(), page: chunk.page }
    }
}

/// One unit of a streaming query's output sequence.
///
/// Contract: zero or more `Token` events, then optionally one `Sources`,
/// then exactly one terminal event (`Done` or `Error`). Nothing ever
/// follows the terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Token { text: String },
    Sources { sources: Vec<SourceRef> },
    Done,
    Error { message: String },
}

impl StreamEvent {
    /// True for the events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
