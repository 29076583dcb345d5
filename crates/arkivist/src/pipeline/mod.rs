//! Document processing pipeline.
//!
//! A document moves through OCR extraction, AI refinement and embedding
//! generation, with every step recorded as a [`PipelineStatus`]
//! transition. The [`PipelineController`] enforces transition legality
//! against the database; the [`PipelineRunner`] executes the stages.

mod controller;
mod error;
mod runner;
mod status;

pub use controller::PipelineController;
pub use error::PipelineError;
pub use runner::{PipelineRunner, StageOutcome};
pub use status::{OcrStatus, PipelineStatus, RefinementStatus};
