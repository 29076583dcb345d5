use std::path::PathBuf;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{AiError, ParseError};

use super::PipelineStatus;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cannot transition from [{from}] to [{to}]")]
    IllegalTransition {
        from: PipelineStatus,
        to: PipelineStatus,
    },

    /// A concurrent writer changed the document between read and write.
    #[error("Document was modified concurrently")]
    Conflict,

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document has no attached file")]
    NoAttachedFile,

    #[error("Attached file does not exist: {0}")]
    FileNotFound(PathBuf),

    #[error("Document is not in a retryable state: {0}")]
    NotRetryable(PipelineStatus),

    #[error("Stage timed out after {0} seconds")]
    Timeout(u64),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
