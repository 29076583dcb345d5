//! Arkivist: backend for a student-records archive.
//!
//! Registered documents move through a three-stage processing pipeline:
//! text extraction (direct or OCR), AI refinement into structured
//! student fields, and embedding generation for semantic search. Stage
//! progress is tracked per document by a validated status machine, and
//! stages run as jobs on a worker pool with retries and timeouts.

pub mod ai;
pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod media;
pub mod parser;
pub mod pipeline;
pub mod refine;
pub mod telemetry;
pub mod worker;

pub use ai::{EmbeddingClient, GeminiClient, GenerativeClient};
pub use config::{load_config, AiConfig, Config, ParsingConfig, PipelineSettings};
pub use db::Database;
pub use embed::{EmbeddingStage, EMBEDDING_DIM};
pub use error::{AiError, ArkivistError, ConfigError, ParseError, Result, WorkerError};
pub use media::{FilesystemMediaStore, MediaStore};
pub use parser::{DocumentParser, ParserRegistry};
pub use pipeline::{
    PipelineController, PipelineError, PipelineRunner, PipelineStatus, StageOutcome,
};
pub use refine::{RefinementData, RefinementOutcome, RefinementStage};
pub use worker::{JobOutcome, RetryPolicy, Stage, StageJob, WorkerPool};
