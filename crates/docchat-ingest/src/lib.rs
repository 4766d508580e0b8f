//! Document ingestion: load, chunk, embed, append, persist.
//!
//! Ingestion runs fully synchronously on the caller's thread and is the
//! only writer of the index blob. It is atomic from the caller's view:
//! any failure leaves the persisted index exactly as it was, and the
//! caller handles cleanup of the source file.

pub mod chunker;
pub mod loader;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use walkdir::WalkDir;

use chunker::{chunk_pages, ChunkingConfig};
use docchat_core::error::{IndexError, IngestError};
use docchat_core::traits::Embedder;
use docchat_core::types::PageChunk;
use docchat_index::FlatIndex;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Single-writer ingestion front end.
///
/// Owns the index path: each ingest loads (or creates) the index,
/// appends, and atomically rewrites the blob. Two ingestions racing on
/// one path are not supported; callers must serialize them.
pub struct Ingestor {
    embedder: Box<dyn Embedder>,
    index_path: PathBuf,
    chunking: ChunkingConfig,
}

impl Ingestor {
    pub fn new(embedder: Box<dyn Embedder>, index_path: PathBuf) -> Self {
        Self { embedder, index_path, chunking: ChunkingConfig::default() }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Ingest one document: pages, chunks, vectors, index append, save.
    /// Re-ingesting the same document duplicates its chunks; clearing
    /// the index first is an external policy decision.
    pub fn ingest(&self, path: &Path) -> Result<IngestReport, IngestError> {
        let doc_id = doc_id_for(path);
        let pages = loader::load_pages(path)?;
        info!(doc = %doc_id, pages = pages.len(), "loaded document");

        let chunks = chunk_pages(&doc_id, &pages, &self.chunking);
        if chunks.is_empty() {
            return Err(IngestError::Unparseable(path.to_path_buf()));
        }
        let batch = self.embed_chunks(chunks)?;

        let mut index = match FlatIndex::load(&self.index_path) {
            Ok(index) => index,
            Err(IndexError::NotLoaded(_)) => FlatIndex::new(),
            Err(e) => return Err(IngestError::Persist(e.into())),
        };
        let appended = batch.len();
        index.append(batch).map_err(|e| IngestError::Embedding(e.into()))?;
        index.save(&self.index_path).map_err(|e| IngestError::Persist(e.into()))?;
        info!(doc = %doc_id, chunks = appended, "ingest complete");
        Ok(IngestReport { documents: 1, chunks: appended })
    }

    /// Walk `dir` and ingest every supported file (pdf, txt, md) in path
    /// order. The first failure aborts the batch; the index keeps its
    /// last successfully saved state.
    pub fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, IngestError> {
        if !dir.exists() {
            return Err(IngestError::NotFound(dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                matches!(p.extension().and_then(|s| s.to_str()), Some("pdf" | "txt" | "md"))
            })
            .collect();
        files.sort();
        if files.is_empty() {
            warn!(dir = %dir.display(), "no ingestable files found");
            return Ok(IngestReport::default());
        }
        let mut report = IngestReport::default();
        for file in &files {
            let r = self.ingest(file)?;
            report.documents += r.documents;
            report.chunks += r.chunks;
        }
        Ok(report)
    }

    fn embed_chunks(
        &self,
        chunks: Vec<PageChunk>,
    ) -> Result<Vec<(PageChunk, Vec<f32>)>, IngestError> {
        let pb = ProgressBar::new(chunks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        let mut batch = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.content).map_err(IngestError::Embedding)?;
            batch.push((chunk, vector));
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(batch)
    }
}

fn doc_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
