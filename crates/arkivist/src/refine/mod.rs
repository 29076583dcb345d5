//! AI refinement of extracted document text into structured fields.

mod data;
mod stage;

pub use data::RefinementData;
pub use stage::{RefinementOutcome, RefinementStage, SYSTEM_INSTRUCTION};
