//! State-machine enforcement for document pipeline transitions.

use crate::db::{content_repo, document_repo, refinement_repo, Database};

use super::{PipelineError, PipelineStatus};

/// Validates and persists pipeline-status transitions.
///
/// All writes go through a compare-and-swap on the document's version
/// column, so two workers racing on the same document cannot both win.
#[derive(Clone)]
pub struct PipelineController {
    db: Database,
}

impl PipelineController {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Moves the document to `new_status`, enforcing the transition
    /// table. The error message is cleared when leaving the failed
    /// state.
    pub fn transition_to(
        &self,
        document_id: &str,
        new_status: PipelineStatus,
    ) -> Result<(), PipelineError> {
        let doc = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;

        if !doc.pipeline_status.can_transition_to(new_status) {
            return Err(PipelineError::IllegalTransition {
                from: doc.pipeline_status,
                to: new_status,
            });
        }

        let clear_error = doc.pipeline_status == PipelineStatus::Failed;
        let updated = document_repo::update_pipeline_status(
            &self.db,
            document_id,
            new_status,
            clear_error,
            doc.version,
        )?;
        if !updated {
            return Err(PipelineError::Conflict);
        }

        log::info!(
            "Document {} transitioned {} -> {}",
            document_id,
            doc.pipeline_status,
            new_status
        );
        Ok(())
    }

    /// Moves the document to the failed state from any state, recording
    /// the error. Skips transition validation so a crash in any stage
    /// can always be recorded.
    pub fn mark_failed(&self, document_id: &str, error: &str) -> Result<(), PipelineError> {
        let updated = document_repo::force_failed(&self.db, document_id, error)?;
        if !updated {
            return Err(PipelineError::DocumentNotFound(document_id.to_string()));
        }
        log::warn!("Document {} marked failed: {}", document_id, error);
        Ok(())
    }

    /// Where a retried document should re-enter the pipeline, derived
    /// from the artifacts that already exist rather than from the
    /// status it failed in.
    pub fn resume_point(&self, document_id: &str) -> Result<PipelineStatus, PipelineError> {
        if content_repo::count_for_document(&self.db, document_id)? == 0 {
            return Ok(PipelineStatus::OcrProcessing);
        }
        if !refinement_repo::has_completed(&self.db, document_id)? {
            return Ok(PipelineStatus::Refining);
        }
        Ok(PipelineStatus::Embedding)
    }

    /// Only failed documents and documents parked after OCR are
    /// eligible for retry.
    pub fn is_retryable(&self, document_id: &str) -> Result<bool, PipelineError> {
        let doc = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;
        Ok(matches!(
            doc.pipeline_status,
            PipelineStatus::Failed | PipelineStatus::OcrCompleted
        ))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
