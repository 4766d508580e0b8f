//! Error taxonomy for the pipeline.
//!
//! Every failure surfaces as a typed result on blocking calls or as a
//! terminal `error` event on streaming calls; nothing is silently
//! swallowed, and no partial success is reported as complete.

use std::path::PathBuf;
use thiserror::Error;

/// Ingestion failures. A failed ingest leaves the persisted index
/// untouched; cleanup of the source file is the caller's job. Only a
/// transient `Persist` is worth retrying.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("no extractable text in {}", .0.display())]
    Unparseable(PathBuf),

    #[error("embedding failed: {0}")]
    Embedding(anyhow::Error),

    #[error("failed to persist index: {0}")]
    Persist(anyhow::Error),
}

/// Vector index failures.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no persisted index at {}", .0.display())]
    NotLoaded(PathBuf),

    #[error("vector dimension mismatch: index holds {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("index persistence failed: {0}")]
    Persist(anyhow::Error),
}

/// Query failures, blocking or streaming. `IndexNotLoaded` means no
/// document has ever been ingested for this deployment.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("vector index has not been created yet")]
    IndexNotLoaded,

    #[error("retrieval failed: {0}")]
    Retrieval(anyhow::Error),

    #[error("query embedding failed: {0}")]
    Embedding(anyhow::Error),

    #[error("answer generation failed: {0}")]
    Generation(anyhow::Error),
}

/// Generator loading and inference failures. Missing or corrupt weights
/// are startup-time fatal conditions, never per-query errors.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("model weights not found at {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("generation failed: {0}")]
    Generation(String),
}
