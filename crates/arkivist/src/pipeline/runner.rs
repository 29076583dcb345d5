//! Executes pipeline stages for queued jobs.

use std::sync::Arc;

use tracing::info_span;

use crate::ai::{EmbeddingClient, GenerativeClient};
use crate::config::PipelineSettings;
use crate::db::{content_repo, document_repo, refinement_repo, text_repo, Database};
use crate::embed::EmbeddingStage;
use crate::media::MediaStore;
use crate::parser::ParserRegistry;
use crate::refine::RefinementStage;
use crate::worker::{RetryPolicy, Stage, StageJob};

use super::{PipelineController, PipelineError, PipelineStatus};

/// What the worker should do after a stage finishes.
#[derive(Debug)]
pub enum StageOutcome {
    /// Enqueue the next stage for this document.
    Continue(StageJob),
    /// The document reached its terminal state.
    Done,
}

/// Runs stage jobs against the database, driving each document through
/// the status machine. Cheap to share across worker threads.
pub struct PipelineRunner {
    db: Database,
    controller: PipelineController,
    registry: Arc<ParserRegistry>,
    media: Arc<dyn MediaStore>,
    refine: Arc<RefinementStage>,
    embed: Arc<EmbeddingStage>,
    retry: RetryPolicy,
}

impl PipelineRunner {
    pub fn new(
        db: Database,
        registry: Arc<ParserRegistry>,
        media: Arc<dyn MediaStore>,
        generative: Arc<dyn GenerativeClient>,
        embedding: Arc<dyn EmbeddingClient>,
        settings: &PipelineSettings,
    ) -> Self {
        let controller = PipelineController::new(db.clone());
        let refine = Arc::new(RefinementStage::new(
            db.clone(),
            generative,
            settings.confidence_threshold,
        ));
        let embed = Arc::new(EmbeddingStage::new(db.clone(), embedding));
        let retry = RetryPolicy::from_settings(settings);
        Self {
            db,
            controller,
            registry,
            media,
            refine,
            embed,
            retry,
        }
    }

    pub fn controller(&self) -> &PipelineController {
        &self.controller
    }

    pub fn run(&self, job: &StageJob) -> Result<StageOutcome, PipelineError> {
        let span = info_span!("pipeline.stage", stage = %job.stage, document_id = %job.document_id);
        let _guard = span.enter();

        match job.stage {
            Stage::Ocr => self.run_ocr(&job.document_id),
            Stage::Refine => self.run_refine(&job.document_id),
            Stage::Embed => self.run_embed(&job.document_id),
        }
    }

    /// Re-queues a document for processing. Failed documents re-enter
    /// from the start and skip work whose artifacts survived; documents
    /// parked after extraction continue with refinement.
    pub fn retry_document(&self, document_id: &str) -> Result<StageJob, PipelineError> {
        let doc = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;
        match doc.pipeline_status {
            PipelineStatus::Failed => {
                self.controller
                    .transition_to(document_id, PipelineStatus::Pending)?;
                Ok(StageJob::ocr(document_id))
            }
            PipelineStatus::OcrCompleted => Ok(StageJob::refine(document_id)),
            status => Err(PipelineError::NotRetryable(status)),
        }
    }

    /// Text extraction. When the document already has extracted content
    /// (a retry after a later-stage failure) the extraction itself is
    /// skipped and only the status moves forward.
    fn run_ocr(&self, document_id: &str) -> Result<StageOutcome, PipelineError> {
        let resume = self.controller.resume_point(document_id)?;
        self.controller
            .transition_to(document_id, PipelineStatus::OcrProcessing)?;

        if resume == PipelineStatus::OcrProcessing {
            let db = self.db.clone();
            let registry = Arc::clone(&self.registry);
            let media = Arc::clone(&self.media);
            let id = document_id.to_string();
            let result = self
                .retry
                .run("ocr", move || extract_document(&db, &registry, &media, &id));
            if let Err(e) = result {
                self.fail_terminal(document_id, Stage::Ocr, &e);
                return Err(e);
            }
        } else {
            log::info!(
                "Document {} already has extracted content, skipping extraction",
                document_id
            );
        }

        self.controller
            .transition_to(document_id, PipelineStatus::OcrCompleted)?;
        Ok(StageOutcome::Continue(StageJob::refine(document_id)))
    }

    fn run_refine(&self, document_id: &str) -> Result<StageOutcome, PipelineError> {
        self.controller
            .transition_to(document_id, PipelineStatus::Refining)?;

        if refinement_repo::has_completed(&self.db, document_id)? {
            log::info!(
                "Document {} already refined, skipping model call",
                document_id
            );
        } else {
            let stage = Arc::clone(&self.refine);
            let id = document_id.to_string();
            let result = self
                .retry
                .run("refine", move || stage.refine_document(&id).map(|_| ()));
            if let Err(e) = result {
                self.fail_terminal(document_id, Stage::Refine, &e);
                return Err(e);
            }
        }

        self.controller
            .transition_to(document_id, PipelineStatus::Refined)?;
        Ok(StageOutcome::Continue(StageJob::embed(document_id)))
    }

    fn run_embed(&self, document_id: &str) -> Result<StageOutcome, PipelineError> {
        self.controller
            .transition_to(document_id, PipelineStatus::Embedding)?;

        let stage = Arc::clone(&self.embed);
        let id = document_id.to_string();
        let result = self.retry.run("embed", move || stage.embed_document(&id));
        if let Err(e) = result {
            self.fail_terminal(document_id, Stage::Embed, &e);
            return Err(e);
        }

        self.controller
            .transition_to(document_id, PipelineStatus::Completed)?;
        Ok(StageOutcome::Done)
    }

    /// Records retry exhaustion on the document and on the stage record
    /// that exhausted. Recording must not mask the stage error, so its
    /// own failures are only logged.
    fn fail_terminal(&self, document_id: &str, stage: Stage, error: &PipelineError) {
        let message = format!("Max retries exceeded: {}", error);
        if let Err(e) = self.controller.mark_failed(document_id, &message) {
            log::error!(
                "Could not record failure for document {}: {}",
                document_id,
                e
            );
        }
        if let Err(e) = self.annotate_stage_record(document_id, stage, &message) {
            log::error!(
                "Could not annotate {} record for document {}: {}",
                stage,
                document_id,
                e
            );
        }
    }

    fn annotate_stage_record(
        &self,
        document_id: &str,
        stage: Stage,
        message: &str,
    ) -> Result<(), PipelineError> {
        match stage {
            Stage::Ocr => {
                if let Some(record) = text_repo::find_by_document(&self.db, document_id)? {
                    text_repo::mark_failed(&self.db, &record.id, message)?;
                }
            }
            Stage::Refine => {
                if let Some(record) = refinement_repo::find_by_document(&self.db, document_id)? {
                    refinement_repo::mark_failed(&self.db, &record.id, message)?;
                }
            }
            // Embeddings have no per-document stage record.
            Stage::Embed => {}
        }
        Ok(())
    }
}

/// One extraction attempt: resolve the attached file, run the parser,
/// store the full text and its page segmentation.
fn extract_document(
    db: &Database,
    registry: &ParserRegistry,
    media: &Arc<dyn MediaStore>,
    document_id: &str,
) -> Result<(), PipelineError> {
    let record = text_repo::find_or_create(db, document_id)?;
    text_repo::mark_processing(db, &record.id)?;

    match resolve_and_extract(db, registry, media, document_id) {
        Ok(text) => {
            text_repo::mark_completed(db, &record.id, &text)?;
            let pages = segment_pages(&text);
            content_repo::replace_for_document(db, document_id, &pages)?;
            Ok(())
        }
        Err(e) => {
            text_repo::mark_failed(db, &record.id, &e.to_string())?;
            Err(e)
        }
    }
}

fn resolve_and_extract(
    db: &Database,
    registry: &ParserRegistry,
    media: &Arc<dyn MediaStore>,
    document_id: &str,
) -> Result<String, PipelineError> {
    let doc = document_repo::find_by_id(db, document_id)?
        .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;
    let path = media
        .attached_file(&doc)
        .ok_or(PipelineError::NoAttachedFile)?;
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path));
    }
    Ok(registry.extract(&path)?)
}

/// Splits extracted text into pages on form feeds, dropping blank
/// pages. A document with no form feeds is a single page.
fn segment_pages(text: &str) -> Vec<String> {
    text.split('\u{c}')
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .map(|page| page.to_string())
        .collect()
}
