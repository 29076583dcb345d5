//! Runs the AI refinement stage for a document.

use std::sync::Arc;

use tracing::info_span;

use crate::ai::GenerativeClient;
use crate::db::document_repo::FileStatus;
use crate::db::{content_repo, document_repo, refinement_repo, Database};
use crate::error::ParseError;
use crate::pipeline::PipelineError;

use super::RefinementData;

/// Instruction sent with every refinement request. The response MIME
/// type is already forced to JSON by the client; this pins the shape.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an archival assistant for a university student records office. \
You are given the OCR text of a scanned student document. Extract the \
following fields and respond with a single JSON object and nothing else: \
student_number, student_name, college, program, document_type, \
enrollment_date, confidence. Use null for any field you cannot determine. \
confidence is your overall extraction confidence between 0 and 1. Put any \
other clearly labeled values you find in an additional_fields object.";

/// Result of a refinement run.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub data: RefinementData,
    /// True when the extraction met the confidence threshold and had
    /// all required fields, so no manual review is needed.
    pub auto_accepted: bool,
}

pub struct RefinementStage {
    db: Database,
    client: Arc<dyn GenerativeClient>,
    confidence_threshold: f64,
}

impl RefinementStage {
    pub fn new(db: Database, client: Arc<dyn GenerativeClient>, confidence_threshold: f64) -> Self {
        Self {
            db,
            client,
            confidence_threshold,
        }
    }

    /// Sends the document's extracted pages to the model and persists
    /// the structured result. The refinement record tracks its own
    /// status; a failure is recorded there before the error propagates.
    pub fn refine_document(&self, document_id: &str) -> Result<RefinementOutcome, PipelineError> {
        let span = info_span!("refine_document", document_id = %document_id);
        let _guard = span.enter();

        let pages = content_repo::list_for_document(&self.db, document_id)?;
        if pages.is_empty() {
            return Err(ParseError::ParseFailure(
                "document has no extracted content to refine".to_string(),
            )
            .into());
        }

        let record = refinement_repo::find_or_create(&self.db, document_id)?;
        refinement_repo::mark_processing(&self.db, &record.id)?;

        let prompt = build_prompt(pages.iter().map(|p| p.content.as_str()));
        let response = match self.client.generate_content(&prompt, Some(SYSTEM_INSTRUCTION)) {
            Ok(response) => response,
            Err(e) => {
                refinement_repo::mark_failed(&self.db, &record.id, &e.to_string())?;
                return Err(e.into());
            }
        };

        let data = RefinementData::from_value(&response);
        let structured = data.to_value().to_string();
        refinement_repo::mark_completed(
            &self.db,
            &record.id,
            &structured,
            Some(data.confidence),
            &response.to_string(),
        )?;

        let auto_accepted = data.is_high_confidence(self.confidence_threshold) && data.is_complete();
        if auto_accepted {
            document_repo::set_file_status(&self.db, document_id, FileStatus::Complete)?;
        }

        log::info!(
            "Refined document {} (confidence {:.1}, auto_accepted: {})",
            document_id,
            data.confidence,
            auto_accepted
        );

        Ok(RefinementOutcome {
            data,
            auto_accepted,
        })
    }
}

fn build_prompt<'a>(pages: impl Iterator<Item = &'a str>) -> String {
    let mut prompt = String::new();
    for (index, page) in pages.enumerate() {
        if index > 0 {
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!("--- Page {} ---\n", index + 1));
        prompt.push_str(page);
    }
    prompt
}
