//! Flat, persisted vector index with full-scan cosine search.
//!
//! One index owns the (chunk, vector) pairs for one corpus snapshot and
//! lives on disk as a single JSON blob. Mutation is append-only; there is
//! no update or delete path, and re-ingesting a document duplicates its
//! chunks (rebuild-on-reingest is the retention policy). The blob is
//! trusted local output, not an adversarial input.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use docchat_core::error::IndexError;
use docchat_core::types::{Chunk, ChunkId, PageChunk, ScoredChunk};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Append-only vector index over one corpus.
///
/// The dimension is fixed by the first appended vector; appends and
/// searches with a different dimension are rejected, so vectors from two
/// embedding models can never mix in one index.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: Option<usize>,
    next_id: ChunkId,
    entries: Vec<Entry>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize the index from `path`. A missing file signals
    /// `NotLoaded` rather than crashing, so a deployment that has never
    /// ingested anything is distinguishable from a broken one.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::NotLoaded(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|e| IndexError::Persist(e.into()))?;
        let index: Self =
            serde_json::from_slice(&bytes).map_err(|e| IndexError::Persist(e.into()))?;
        Ok(index)
    }

    /// Serialize the full index to `path`, atomically: the blob is
    /// written to a temp file in the destination directory and renamed
    /// over the old one, so a failed save leaves the previous snapshot
    /// intact byte-for-byte.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| IndexError::Persist(e.into()))?;
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| IndexError::Persist(e.into()))?;
        serde_json::to_writer(tmp.as_file_mut(), self)
            .map_err(|e| IndexError::Persist(e.into()))?;
        tmp.persist(path).map_err(|e| IndexError::Persist(e.error.into()))?;
        info!(path = %path.display(), entries = self.entries.len(), "index saved");
        Ok(())
    }

    /// Append a batch of pairs, assigning each chunk its id. No
    /// deduplication happens here.
    pub fn append(
        &mut self,
        batch: Vec<(PageChunk, Vec<f32>)>,
    ) -> Result<Vec<ChunkId>, IndexError> {
        let mut ids = Vec::with_capacity(batch.len());
        for (chunk, vector) in batch {
            let dim = *self.dim.get_or_insert(vector.len());
            if vector.len() != dim {
                return Err(IndexError::DimensionMismatch { expected: dim, got: vector.len() });
            }
            let id = self.next_id;
            self.next_id += 1;
            self.entries.push(Entry {
                chunk: Chunk { id, doc_id: chunk.doc_id, page: chunk.page, content: chunk.content },
                vector,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    /// Nearest-neighbor search by cosine similarity: at most `k` hits,
    /// nearest first, ties kept in insertion order (the sort is stable).
    /// An empty index yields zero results, not an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if let Some(dim) = self.dim {
            if query.len() != dim {
                return Err(IndexError::DimensionMismatch { expected: dim, got: query.len() });
            }
        }
        let mut hits: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|e| ScoredChunk { chunk: e.chunk.clone(), score: cosine(query, &e.vector) })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut norm_a = 0f32;
    let mut norm_b = 0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a.sqrt() * norm_b.sqrt()).max(1e-12);
    dot / denom
}
