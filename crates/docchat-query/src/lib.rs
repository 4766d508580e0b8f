//! Query orchestration: embed the question, retrieve the nearest chunks,
//! assemble the prompt, generate (blocking or streaming).

pub mod prompt;
pub mod stream;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use docchat_core::error::{IndexError, QueryError};
use docchat_core::traits::{Embedder, Generator};
use docchat_core::types::{ScoredChunk, SourceRef};
use docchat_index::FlatIndex;

pub use stream::EventStream;

/// Default number of chunks retrieved per query. Deployment
/// configuration, never user-supplied.
pub const DEFAULT_TOP_K: usize = 2;

/// A completed blocking answer.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Owns the pipeline's handles: embedder, generator, and a lazily loaded
/// read-only index.
///
/// The index loads from disk on the first query and is then shared
/// across concurrent searches as one immutable snapshot; an ingestion
/// that rewrites the blob is picked up on the next process start, not
/// mid-flight. Constructed and passed explicitly; there are no
/// module-level singletons.
pub struct QueryEngine {
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
    index_path: PathBuf,
    top_k: usize,
    index: Mutex<Option<Arc<FlatIndex>>>,
}

impl QueryEngine {
    pub fn new(
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
        index_path: PathBuf,
    ) -> Self {
        Self { embedder, generator, index_path, top_k: DEFAULT_TOP_K, index: Mutex::new(None) }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    fn index(&self) -> Result<Arc<FlatIndex>, QueryError> {
        let mut slot = self
            .index
            .lock()
            .map_err(|_| QueryError::Retrieval(anyhow::anyhow!("index lock poisoned")))?;
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }
        let index = match FlatIndex::load(&self.index_path) {
            Ok(index) => Arc::new(index),
            Err(IndexError::NotLoaded(_)) => return Err(QueryError::IndexNotLoaded),
            Err(e) => return Err(QueryError::Retrieval(e.into())),
        };
        info!(entries = index.len(), "vector index loaded");
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Embed the query and fetch the top-k nearest chunks.
    pub fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, QueryError> {
        let index = self.index()?;
        let query_vec = self.embedder.embed(query).map_err(QueryError::Embedding)?;
        let hits =
            index.search(&query_vec, self.top_k).map_err(|e| QueryError::Retrieval(e.into()))?;
        debug!(query, hits = hits.len(), "retrieval complete");
        Ok(hits)
    }

    /// Full pipeline with a caller-supplied token sink; shared by the
    /// blocking and streaming modes.
    pub(crate) fn run_query(
        &self,
        query: &str,
        on_token: &mut dyn FnMut(&str),
    ) -> Result<Answer, QueryError> {
        let hits = self.retrieve(query)?;
        let prompt = prompt::build_prompt(&prompt::context_text(&hits), query);
        let text = self.generator.generate(&prompt, on_token).map_err(QueryError::Generation)?;
        let sources = hits.iter().map(|h| SourceRef::from(&h.chunk)).collect();
        Ok(Answer { text, sources })
    }

    /// Blocking mode: runs on the caller's thread and returns the whole
    /// answer plus sources once generation completes. No partial answer
    /// on failure.
    pub fn answer(&self, query: &str) -> Result<Answer, QueryError> {
        self.run_query(query, &mut |_| {})
    }

    /// Streaming mode: spawns the worker and returns the lazy event
    /// sequence (see [`stream`]). Takes the shared handle because the
    /// worker outlives this call.
    pub fn answer_stream(self: Arc<Self>, query: &str) -> EventStream {
        stream::spawn_stream(self, query.to_string())
    }
}
